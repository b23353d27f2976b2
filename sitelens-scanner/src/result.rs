use crate::urls::UrlCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A URL seen during a crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    /// Only set once the page was fetched with HTTP 200
    pub category: Option<UrlCategory>,
    pub visited: bool,
}

/// Why a visited URL produced no links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub base_url: String,
    pub robots_loaded: bool,
    pub total_urls: usize,
    pub visited_urls: usize,
    pub categories: BTreeMap<UrlCategory, Vec<String>>,
    pub urls: Vec<DiscoveredUrl>,
    #[serde(default)]
    pub skipped_by_robots: Vec<String>,
    #[serde(default)]
    pub failures: Vec<CrawlFailure>,
    #[serde(default)]
    pub sitemaps: Vec<String>,
}

impl CrawlResult {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            robots_loaded: false,
            total_urls: 0,
            visited_urls: 0,
            categories: empty_categories(),
            urls: Vec::new(),
            skipped_by_robots: Vec::new(),
            failures: Vec::new(),
            sitemaps: Vec::new(),
        }
    }

    pub fn urls_in(&self, category: UrlCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn categorized_count(&self) -> usize {
        self.categories.values().map(|v| v.len()).sum()
    }
}

/// One empty bucket per category, so every key is present in artifacts
pub fn empty_categories() -> BTreeMap<UrlCategory, Vec<String>> {
    UrlCategory::ALL.iter().map(|c| (*c, Vec::new())).collect()
}

/// Security headers copied from a response when present
pub const SECURITY_HEADERS: [&str; 7] = [
    "strict-transport-security",
    "x-frame-options",
    "x-content-type-options",
    "x-xss-protection",
    "content-security-policy",
    "referrer-policy",
    "permissions-policy",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
    pub h4: usize,
    pub h5: usize,
    pub h6: usize,
}

impl HeadingCounts {
    /// Set the count for heading level 1-6; other levels are ignored
    pub fn set(&mut self, level: usize, count: usize) {
        match level {
            1 => self.h1 = count,
            2 => self.h2 = count,
            3 => self.h3 = count,
            4 => self.h4 = count,
            5 => self.h5 = count,
            6 => self.h6 = count,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hreflang {
    pub lang: String,
    pub href: Option<String>,
}

/// On-page signals for a single URL.
///
/// When `error` is set every content field holds its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub url: String,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    #[serde(default)]
    pub meta_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub headings: HeadingCounts,
    #[serde(default)]
    pub schema: Vec<serde_json::Value>,
    #[serde(default)]
    pub open_graph: BTreeMap<String, String>,
    #[serde(default)]
    pub twitter_card: BTreeMap<String, String>,
    pub canonical: Option<String>,
    #[serde(default)]
    pub hreflang: Vec<Hreflang>,
    pub robots_meta: Option<String>,
    pub sitemap_reference: Option<String>,
    #[serde(default)]
    pub security_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub mixed_content: bool,
    #[serde(default)]
    pub https_redirect: bool,
}

impl PageAnalysis {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }

    pub fn with_error(url: String, status_code: Option<u16>, error: String) -> Self {
        Self {
            url,
            status_code,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Lighthouse metrics for one page and one strategy. Times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub performance_score: Option<u32>,
    pub lcp: Option<f64>,
    pub cls: Option<f64>,
    pub fcp: Option<f64>,
    pub tti: Option<f64>,
    /// Server response time, or the field-data percentile when the lab audit is absent
    pub ttfb: Option<f64>,
    pub speed_index: Option<f64>,
    pub accessibility_score: Option<u32>,
    pub best_practices_score: Option<u32>,
    pub seo_score: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StrategyOutcome {
    Ok(PerformanceMetrics),
    Error { message: String },
}

impl StrategyOutcome {
    pub fn metrics(&self) -> Option<&PerformanceMetrics> {
        match self {
            StrategyOutcome::Ok(m) => Some(m),
            StrategyOutcome::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePerformance {
    pub url: String,
    pub category: Option<UrlCategory>,
    pub mobile: StrategyOutcome,
    pub desktop: StrategyOutcome,
}
