use crate::result::{HeadingCounts, Hreflang, PageAnalysis, SECURITY_HEADERS};
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

/// Called before each page with (position, total, url)
pub type AnalysisCallback = Arc<dyn Fn(usize, usize, String) + Send + Sync>;

static META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta").expect("Failed to parse meta selector - this is a bug")
});

static HEADING_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    (1..=6)
        .map(|level| {
            Selector::parse(&format!("h{}", level))
                .expect("Failed to parse heading selector - this is a bug")
        })
        .collect()
});

static JSON_LD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("Failed to parse JSON-LD selector - this is a bug")
});

static CANONICAL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="canonical"][href]"#)
        .expect("Failed to parse canonical selector - this is a bug")
});

static HREFLANG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="alternate"][hreflang]"#)
        .expect("Failed to parse hreflang selector - this is a bug")
});

static ROBOTS_META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="robots"][content]"#)
        .expect("Failed to parse robots meta selector - this is a bug")
});

static SITEMAP_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="sitemap"][href]"#)
        .expect("Failed to parse sitemap selector - this is a bug")
});

static ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>]+"#).expect("hardcoded regex pattern is valid")
});

/// Fetches pages and extracts their on-page SEO and security signals.
pub struct OnPageAnalyzer {
    client: Client,
    page_timeout: Duration,
    upgrade_timeout: Duration,
    progress_callback: Option<AnalysisCallback>,
}

impl OnPageAnalyzer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            upgrade_timeout: DEFAULT_UPGRADE_TIMEOUT,
            progress_callback: None,
        }
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn with_upgrade_timeout(mut self, timeout: Duration) -> Self {
        self.upgrade_timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: AnalysisCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Analyze one URL. Never fails: problems are reported in `error`.
    pub async fn analyze(&self, url: &str) -> PageAnalysis {
        let mut fetch_url = url.to_string();
        let mut https_redirect = false;

        if let Some(rest) = url.strip_prefix("http://") {
            let https_url = format!("https://{}", rest);
            if self.https_available(&https_url).await {
                debug!("{} is served over HTTPS", url);
                fetch_url = https_url;
                https_redirect = true;
            }
        }

        let response = match self
            .client
            .get(&fetch_url)
            .timeout(self.page_timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Could not fetch {}: {}", fetch_url, e);
                return PageAnalysis::with_error(url.to_string(), None, e.to_string());
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            debug!("Status {} for {}", status, fetch_url);
            return PageAnalysis::with_error(
                url.to_string(),
                Some(status),
                format!("HTTP {}", status),
            );
        }

        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read body of {}: {}", fetch_url, e);
                return PageAnalysis::with_error(url.to_string(), Some(status), e.to_string());
            }
        };

        let mut analysis = parse_page(url, &fetch_url, &body, &headers);
        analysis.status_code = Some(status);
        analysis.https_redirect = https_redirect;
        analysis
    }

    /// Analyze every URL in order. Keys are the URLs as given.
    pub async fn analyze_all<I, S>(&self, urls: I) -> BTreeMap<String, PageAnalysis>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Vec<S> = urls.into_iter().collect();
        let total = urls.len();
        info!("Analyzing {} URLs for on-page signals", total);

        let mut results = BTreeMap::new();
        for (i, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            if let Some(ref callback) = self.progress_callback {
                callback(i + 1, total, url.to_string());
            }
            let analysis = self.analyze(url).await;
            results.insert(url.to_string(), analysis);
        }

        info!("On-page analysis complete for {} URLs", results.len());
        results
    }

    async fn https_available(&self, https_url: &str) -> bool {
        match self
            .client
            .get(https_url)
            .timeout(self.upgrade_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().as_u16() == 200,
            Err(e) => {
                debug!("HTTPS upgrade failed for {}: {}", https_url, e);
                false
            }
        }
    }
}

/// Extract every on-page signal from an already fetched 200 response.
///
/// `url` is recorded in the result; `fetched_url` decides whether the page
/// was served over HTTPS for the mixed-content check.
pub fn parse_page(url: &str, fetched_url: &str, html: &str, headers: &HeaderMap) -> PageAnalysis {
    let document = Html::parse_document(html);

    let mut analysis = PageAnalysis::new(url.to_string());
    analysis.meta_tags = extract_meta_tags(&document);
    analysis.headings = extract_headings(&document);
    analysis.schema = extract_schema(&document);
    analysis.open_graph = extract_prefixed_meta(&document, "property", "og:");
    analysis.twitter_card = extract_prefixed_meta(&document, "name", "twitter:");
    analysis.canonical = first_attr(&document, &CANONICAL_SELECTOR, "href");
    analysis.hreflang = extract_hreflang(&document);
    analysis.robots_meta = first_attr(&document, &ROBOTS_META_SELECTOR, "content");
    analysis.sitemap_reference = first_attr(&document, &SITEMAP_SELECTOR, "href");
    analysis.mixed_content = has_mixed_content(html, fetched_url);
    analysis.security_headers = extract_security_headers(headers);
    analysis
}

fn extract_meta_tags(document: &Html) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();

    for attr in ["name", "property"] {
        for element in document.select(&META_SELECTOR) {
            let el = element.value();
            if let (Some(key), Some(content)) = (el.attr(attr), el.attr("content"))
                && !key.is_empty()
                && !content.is_empty()
            {
                tags.insert(key.to_string(), content.to_string());
            }
        }
    }

    if let Some(charset) = document
        .select(&META_SELECTOR)
        .find_map(|element| element.value().attr("charset"))
    {
        tags.insert("charset".to_string(), charset.to_string());
    }

    tags
}

fn extract_headings(document: &Html) -> HeadingCounts {
    let mut headings = HeadingCounts::default();
    for (i, selector) in HEADING_SELECTORS.iter().enumerate() {
        headings.set(i + 1, document.select(selector).count());
    }
    headings
}

/// JSON-LD blocks; top-level arrays are flattened and malformed blocks skipped
fn extract_schema(document: &Html) -> Vec<serde_json::Value> {
    let mut schemas = Vec::new();

    for script in document.select(&JSON_LD_SELECTOR) {
        let content: String = script.text().collect();
        if content.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Array(items)) => schemas.extend(items),
            Ok(value) => schemas.push(value),
            Err(e) => debug!("Skipping malformed JSON-LD block: {}", e),
        }
    }

    schemas
}

fn extract_prefixed_meta(document: &Html, attr: &str, prefix: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();

    for element in document.select(&META_SELECTOR) {
        let el = element.value();
        let Some(name) = el.attr(attr).and_then(|v| v.strip_prefix(prefix)) else {
            continue;
        };
        let content = el.attr("content").unwrap_or_default();
        if !name.is_empty() && !content.is_empty() {
            tags.insert(name.to_string(), content.to_string());
        }
    }

    tags
}

fn extract_hreflang(document: &Html) -> Vec<Hreflang> {
    document
        .select(&HREFLANG_SELECTOR)
        .filter_map(|element| {
            let el = element.value();
            el.attr("hreflang").map(|lang| Hreflang {
                lang: lang.to_string(),
                href: el.attr("href").map(str::to_string),
            })
        })
        .collect()
}

fn first_attr(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr(attr))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// An HTTPS page that references any plain `http://` URL
pub fn has_mixed_content(html: &str, page_url: &str) -> bool {
    if !page_url.starts_with("https://") {
        return false;
    }
    ABSOLUTE_URL
        .find_iter(html)
        .any(|m| m.as_str().starts_with("http://"))
}

fn extract_security_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut found = BTreeMap::new();
    for name in SECURITY_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok())
            && !value.is_empty()
        {
            found.insert(name.to_string(), value.to_string());
        }
    }
    found
}
