// PageSpeed Insights v5 client and Lighthouse metric extraction

use crate::error::Result;
use crate::result::{PagePerformance, PerformanceMetrics, Strategy, StrategyOutcome};
use crate::urls::UrlCategory;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const PAGESPEED_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
pub const API_KEY_ENV: &str = "PAGESPEED_INSIGHTS_API_KEY";
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CATEGORIES: [&str; 4] = ["performance", "accessibility", "best-practices", "seo"];

/// Called before each page with (position, total, url)
pub type MeasureCallback = Arc<dyn Fn(usize, usize, String) + Send + Sync>;

/// Raw Lighthouse response kept alongside the extracted metrics
#[derive(Debug, Clone)]
pub struct RawReport {
    pub url: String,
    pub strategy: Strategy,
    pub body: Value,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceRun {
    pub pages: BTreeMap<String, PagePerformance>,
    pub raw_reports: Vec<RawReport>,
}

pub struct PageSpeedClient {
    client: Client,
    api_key: String,
    endpoint: String,
    pause: Duration,
    timeout: Duration,
    progress_callback: Option<MeasureCallback>,
}

impl PageSpeedClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: PAGESPEED_ENDPOINT.to_string(),
            pause: DEFAULT_PAUSE,
            timeout: DEFAULT_TIMEOUT,
            progress_callback: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Pause after every API call to stay under the rate limit
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: MeasureCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// One Lighthouse run. Non-2xx responses are errors.
    pub async fn run(&self, url: &str, strategy: Strategy) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = vec![
            ("url", url),
            ("key", self.api_key.as_str()),
            ("strategy", strategy.as_str()),
        ];
        query.extend(CATEGORIES.iter().map(|c| ("category", *c)));

        debug!("PageSpeed {} run for {}", strategy.as_str(), url);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }

    /// Mobile then desktop for a single page. Failures are recorded per strategy.
    pub async fn measure(
        &self,
        url: &str,
        category: Option<UrlCategory>,
        raw_reports: &mut Vec<RawReport>,
    ) -> PagePerformance {
        let mobile = self.outcome(url, Strategy::Mobile, raw_reports).await;
        let desktop = self.outcome(url, Strategy::Desktop, raw_reports).await;

        PagePerformance {
            url: url.to_string(),
            category,
            mobile,
            desktop,
        }
    }

    pub async fn measure_all<I>(&self, pages: I) -> PerformanceRun
    where
        I: IntoIterator<Item = (String, Option<UrlCategory>)>,
    {
        let pages: Vec<(String, Option<UrlCategory>)> = pages.into_iter().collect();
        let total = pages.len();
        info!("Measuring {} URLs with PageSpeed Insights", total);

        let mut run = PerformanceRun::default();
        for (i, (url, category)) in pages.into_iter().enumerate() {
            if let Some(ref callback) = self.progress_callback {
                callback(i + 1, total, url.clone());
            }
            let page = self.measure(&url, category, &mut run.raw_reports).await;
            run.pages.insert(url, page);
        }
        run
    }

    async fn outcome(
        &self,
        url: &str,
        strategy: Strategy,
        raw_reports: &mut Vec<RawReport>,
    ) -> StrategyOutcome {
        let outcome = match self.run(url, strategy).await {
            Ok(body) => {
                let metrics = extract_metrics(&body);
                debug!(
                    "{} {}: score {:?}, LCP {:?}s, CLS {:?}",
                    url,
                    strategy.as_str(),
                    metrics.performance_score,
                    metrics.lcp,
                    metrics.cls
                );
                raw_reports.push(RawReport {
                    url: url.to_string(),
                    strategy,
                    body,
                });
                StrategyOutcome::Ok(metrics)
            }
            Err(e) => {
                warn!("PageSpeed {} run failed for {}: {}", strategy.as_str(), url, e);
                StrategyOutcome::Error {
                    message: e.to_string(),
                }
            }
        };

        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        outcome
    }
}

/// Pull scores and timings out of a PageSpeed Insights response.
///
/// Category scores are scaled from 0-1 to 0-100; timings are converted
/// from milliseconds to seconds. CLS is unitless and kept as is.
/// TTFB comes from the `server-response-time` audit, falling back to the
/// CrUX field percentile in `loadingExperience`.
pub fn extract_metrics(data: &Value) -> PerformanceMetrics {
    let lighthouse = &data["lighthouseResult"];
    let categories = &lighthouse["categories"];
    let audits = &lighthouse["audits"];

    let score = |name: &str| {
        categories[name]["score"]
            .as_f64()
            .map(|s| (s * 100.0).round() as u32)
    };
    let numeric = |audit: &str| audits[audit]["numericValue"].as_f64();
    let seconds = |audit: &str| numeric(audit).map(|ms| ms / 1000.0);

    PerformanceMetrics {
        performance_score: score("performance"),
        lcp: seconds("largest-contentful-paint"),
        cls: numeric("cumulative-layout-shift"),
        fcp: seconds("first-contentful-paint"),
        tti: seconds("interactive"),
        ttfb: seconds("server-response-time").or_else(|| field_ttfb(data)),
        speed_index: seconds("speed-index"),
        accessibility_score: score("accessibility"),
        best_practices_score: score("best-practices"),
        seo_score: score("seo"),
    }
}

fn field_ttfb(data: &Value) -> Option<f64> {
    data["loadingExperience"]["metrics"]["EXPERIMENTAL_TIME_TO_FIRST_BYTE"]["percentile"]
        .as_f64()
        .map(|ms| ms / 1000.0)
}

/// File-name-safe stem for a raw report, e.g. `shop.test_products_a_mobile`
pub fn raw_report_stem(url: &str, strategy: Strategy) -> String {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let safe: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{}_{}", safe, strategy.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lighthouse(score: f64) -> Value {
        json!({
            "lighthouseResult": {
                "categories": {
                    "performance": {"score": score},
                    "accessibility": {"score": 0.91},
                    "best-practices": {"score": 0.78},
                    "seo": {"score": 1.0}
                },
                "audits": {
                    "largest-contentful-paint": {"numericValue": 5230.5},
                    "cumulative-layout-shift": {"numericValue": 0.12},
                    "first-contentful-paint": {"numericValue": 1800.0},
                    "interactive": {"numericValue": 11000.0},
                    "speed-index": {"numericValue": 4200.0}
                }
            }
        })
    }

    #[test]
    fn test_extract_metrics() {
        let metrics = extract_metrics(&lighthouse(0.45));

        assert_eq!(metrics.performance_score, Some(45));
        assert_eq!(metrics.accessibility_score, Some(91));
        assert_eq!(metrics.best_practices_score, Some(78));
        assert_eq!(metrics.seo_score, Some(100));
        assert!((metrics.lcp.unwrap() - 5.2305).abs() < 1e-9);
        assert_eq!(metrics.cls, Some(0.12));
        assert_eq!(metrics.fcp, Some(1.8));
        assert_eq!(metrics.tti, Some(11.0));
        assert_eq!(metrics.speed_index, Some(4.2));
        assert_eq!(metrics.ttfb, None);
    }

    #[test]
    fn test_extract_metrics_ttfb_from_server_response_time() {
        let mut data = lighthouse(0.9);
        data["lighthouseResult"]["audits"]["server-response-time"] =
            json!({"numericValue": 640.0});
        data["loadingExperience"] = json!({
            "metrics": {"EXPERIMENTAL_TIME_TO_FIRST_BYTE": {"percentile": 1900}}
        });

        assert_eq!(extract_metrics(&data).ttfb, Some(0.64));
    }

    #[test]
    fn test_extract_metrics_ttfb_falls_back_to_field_data() {
        let mut data = lighthouse(0.9);
        data["loadingExperience"] = json!({
            "metrics": {"EXPERIMENTAL_TIME_TO_FIRST_BYTE": {"percentile": 1900}}
        });

        assert_eq!(extract_metrics(&data).ttfb, Some(1.9));
    }

    #[test]
    fn test_extract_metrics_rounds_scores() {
        // 0.29 * 100 is 28.999999999999996 in binary floating point
        assert_eq!(extract_metrics(&lighthouse(0.29)).performance_score, Some(29));
    }

    #[test]
    fn test_extract_metrics_missing_fields() {
        let metrics = extract_metrics(&json!({}));
        assert_eq!(metrics, PerformanceMetrics::default());
    }

    #[test]
    fn test_raw_report_stem() {
        assert_eq!(
            raw_report_stem("https://shop.test/products/a?x=1", Strategy::Mobile),
            "shop.test_products_a_x_1_mobile"
        );
    }
}
