// Core Web Vitals rollup of a PageSpeed run, grouped by page type

use serde::{Deserialize, Serialize};
use sitelens_scanner::UrlCategory;
use sitelens_scanner::result::{PagePerformance, PerformanceMetrics};
use std::collections::BTreeMap;
use tracing::debug;

/// Share of storefront traffic each page type stands for in the weighted score
pub const SCORE_WEIGHTS: [(UrlCategory, f64); 3] = [
    (UrlCategory::Home, 0.17),
    (UrlCategory::Product, 0.40),
    (UrlCategory::Category, 0.43),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vital {
    Lcp,
    Fcp,
    Cls,
    Tti,
    Ttfb,
}

/// Upper bounds, inclusive, for a good and a needs-improvement reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub good: f64,
    pub needs_improvement: f64,
}

impl Vital {
    pub const ALL: [Vital; 5] = [Vital::Lcp, Vital::Fcp, Vital::Cls, Vital::Tti, Vital::Ttfb];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vital::Lcp => "lcp",
            Vital::Fcp => "fcp",
            Vital::Cls => "cls",
            Vital::Tti => "tti",
            Vital::Ttfb => "ttfb",
        }
    }

    pub fn threshold(&self) -> Threshold {
        let (good, needs_improvement) = match self {
            Vital::Lcp => (2.5, 4.0),
            Vital::Fcp => (1.8, 3.0),
            Vital::Cls => (0.1, 0.25),
            Vital::Tti => (3.8, 7.3),
            Vital::Ttfb => (0.8, 1.8),
        };
        Threshold {
            good,
            needs_improvement,
        }
    }

    pub fn value(&self, metrics: &PerformanceMetrics) -> Option<f64> {
        match self {
            Vital::Lcp => metrics.lcp,
            Vital::Fcp => metrics.fcp,
            Vital::Cls => metrics.cls,
            Vital::Tti => metrics.tti,
            Vital::Ttfb => metrics.ttfb,
        }
    }

    pub fn rate(&self, value: f64) -> Rating {
        let threshold = self.threshold();
        if value <= threshold.good {
            Rating::Good
        } else if value <= threshold.needs_improvement {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }
}

impl std::fmt::Display for Vital {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    pub good: usize,
    pub needs_improvement: usize,
    pub poor: usize,
}

impl RatingCounts {
    fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Good => self.good += 1,
            Rating::NeedsImprovement => self.needs_improvement += 1,
            Rating::Poor => self.poor += 1,
        }
    }
}

/// Mean of each metric over the pages that reported it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricAverages {
    pub performance_score: Option<f64>,
    pub lcp: Option<f64>,
    pub cls: Option<f64>,
    pub fcp: Option<f64>,
    pub tti: Option<f64>,
    pub ttfb: Option<f64>,
    pub speed_index: Option<f64>,
}

impl MetricAverages {
    fn from_metrics(metrics: &[&PerformanceMetrics]) -> Self {
        let avg = |field: fn(&PerformanceMetrics) -> Option<f64>| {
            average(metrics.iter().filter_map(|m| field(m)))
        };

        Self {
            performance_score: avg(|m| m.performance_score.map(f64::from)),
            lcp: avg(|m| m.lcp),
            cls: avg(|m| m.cls),
            fcp: avg(|m| m.fcp),
            tti: avg(|m| m.tti),
            ttfb: avg(|m| m.ttfb),
            speed_index: avg(|m| m.speed_index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyVitals {
    pub averages: MetricAverages,
    /// Per-page ratings; a vital is only listed when some page reported it
    pub ratings: BTreeMap<Vital, RatingCounts>,
}

impl StrategyVitals {
    fn from_metrics(metrics: &[&PerformanceMetrics]) -> Self {
        let mut ratings: BTreeMap<Vital, RatingCounts> = BTreeMap::new();
        for page in metrics {
            for vital in Vital::ALL {
                if let Some(value) = vital.value(page) {
                    ratings.entry(vital).or_default().record(vital.rate(value));
                }
            }
        }

        Self {
            averages: MetricAverages::from_metrics(metrics),
            ratings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVitals {
    pub page_count: usize,
    pub mobile: StrategyVitals,
    pub desktop: StrategyVitals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstPage {
    pub url: String,
    pub category: UrlCategory,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsSummary {
    /// Pages with at least one successful strategy
    pub pages_analyzed: usize,
    pub categories: BTreeMap<UrlCategory, CategoryVitals>,
    pub worst_mobile: BTreeMap<Vital, WorstPage>,
    pub worst_desktop: BTreeMap<Vital, WorstPage>,
    /// Traffic-weighted mean of the per-type mobile performance averages
    pub weighted_mobile_score: Option<f64>,
}

/// Page types reported on their own; everything else is rolled into `Other`
pub fn summary_group(category: Option<UrlCategory>) -> UrlCategory {
    match category {
        Some(c @ (UrlCategory::Home | UrlCategory::Category | UrlCategory::Product)) => c,
        _ => UrlCategory::Other,
    }
}

pub fn summarize(pages: &BTreeMap<String, PagePerformance>) -> VitalsSummary {
    let mut groups: BTreeMap<UrlCategory, Vec<&PagePerformance>> = BTreeMap::new();
    for page in pages.values() {
        if page.mobile.metrics().is_none() && page.desktop.metrics().is_none() {
            debug!("No metrics for {}, left out of the vitals summary", page.url);
            continue;
        }
        groups.entry(summary_group(page.category)).or_default().push(page);
    }

    let categories: BTreeMap<UrlCategory, CategoryVitals> = groups
        .iter()
        .map(|(category, pages)| {
            let mobile: Vec<&PerformanceMetrics> =
                pages.iter().filter_map(|p| p.mobile.metrics()).collect();
            let desktop: Vec<&PerformanceMetrics> =
                pages.iter().filter_map(|p| p.desktop.metrics()).collect();
            let vitals = CategoryVitals {
                page_count: pages.len(),
                mobile: StrategyVitals::from_metrics(&mobile),
                desktop: StrategyVitals::from_metrics(&desktop),
            };
            (*category, vitals)
        })
        .collect();

    let weighted_mobile_score = weighted_mobile_score(&categories);

    VitalsSummary {
        pages_analyzed: groups.values().map(|g| g.len()).sum(),
        worst_mobile: worst_pages(&groups, |p| p.mobile.metrics()),
        worst_desktop: worst_pages(&groups, |p| p.desktop.metrics()),
        categories,
        weighted_mobile_score,
    }
}

/// Weighted mobile score over the page types that have one, rounded to a
/// tenth. Weights of missing types are left out of the denominator.
pub fn weighted_mobile_score(categories: &BTreeMap<UrlCategory, CategoryVitals>) -> Option<f64> {
    let (total_weight, weighted) = SCORE_WEIGHTS
        .iter()
        .filter_map(|(category, weight)| {
            categories
                .get(category)
                .and_then(|v| v.mobile.averages.performance_score)
                .map(|score| (*weight, score))
        })
        .fold((0.0, 0.0), |(tw, ws), (w, s)| (tw + w, ws + w * s));

    if total_weight > 0.0 {
        Some((weighted / total_weight * 10.0).round() / 10.0)
    } else {
        None
    }
}

fn worst_pages<'a>(
    groups: &BTreeMap<UrlCategory, Vec<&'a PagePerformance>>,
    metrics: impl Fn(&'a PagePerformance) -> Option<&'a PerformanceMetrics>,
) -> BTreeMap<Vital, WorstPage> {
    let mut worst: BTreeMap<Vital, WorstPage> = BTreeMap::new();
    for (category, pages) in groups {
        for &page in pages {
            let Some(m) = metrics(page) else {
                continue;
            };
            for vital in Vital::ALL {
                let Some(value) = vital.value(m) else {
                    continue;
                };
                if worst.get(&vital).is_none_or(|w| value > w.value) {
                    worst.insert(
                        vital,
                        WorstPage {
                            url: page.url.clone(),
                            category: *category,
                            value,
                        },
                    );
                }
            }
        }
    }
    worst
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries_are_inclusive() {
        assert_eq!(Vital::Lcp.rate(2.5), Rating::Good);
        assert_eq!(Vital::Lcp.rate(2.51), Rating::NeedsImprovement);
        assert_eq!(Vital::Lcp.rate(4.0), Rating::NeedsImprovement);
        assert_eq!(Vital::Lcp.rate(4.01), Rating::Poor);

        assert_eq!(Vital::Fcp.rate(1.8), Rating::Good);
        assert_eq!(Vital::Fcp.rate(3.0), Rating::NeedsImprovement);
        assert_eq!(Vital::Fcp.rate(3.1), Rating::Poor);

        assert_eq!(Vital::Cls.rate(0.1), Rating::Good);
        assert_eq!(Vital::Cls.rate(0.25), Rating::NeedsImprovement);
        assert_eq!(Vital::Cls.rate(0.26), Rating::Poor);

        assert_eq!(Vital::Tti.rate(3.8), Rating::Good);
        assert_eq!(Vital::Tti.rate(7.3), Rating::NeedsImprovement);
        assert_eq!(Vital::Tti.rate(7.4), Rating::Poor);

        assert_eq!(Vital::Ttfb.rate(0.8), Rating::Good);
        assert_eq!(Vital::Ttfb.rate(1.8), Rating::NeedsImprovement);
        assert_eq!(Vital::Ttfb.rate(1.81), Rating::Poor);
    }

    #[test]
    fn test_summary_group_folds_minor_types_into_other() {
        assert_eq!(summary_group(Some(UrlCategory::Home)), UrlCategory::Home);
        assert_eq!(summary_group(Some(UrlCategory::Product)), UrlCategory::Product);
        assert_eq!(summary_group(Some(UrlCategory::Category)), UrlCategory::Category);
        assert_eq!(summary_group(Some(UrlCategory::Cart)), UrlCategory::Other);
        assert_eq!(summary_group(None), UrlCategory::Other);
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert_eq!(average(std::iter::empty()), None);
        assert_eq!(average([1.0, 2.0, 6.0].into_iter()), Some(3.0));
    }
}
