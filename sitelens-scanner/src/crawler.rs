use crate::error::{Result, ScanError};
use crate::result::{CrawlFailure, CrawlResult, DiscoveredUrl};
use crate::robots::RobotsGate;
use crate::urls::{self, UrlCategory};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Called before each fetch with the number of URLs visited so far
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("Failed to parse link selector - this is a bug")
});

pub const DEFAULT_MAX_URLS: usize = 120;
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CRAWL_DELAY: Duration = Duration::from_millis(500);

/// Crawl limits, usually built from command-line arguments
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub max_urls: usize,
    pub page_timeout: Duration,
    pub delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_urls: DEFAULT_MAX_URLS,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            delay: DEFAULT_CRAWL_DELAY,
        }
    }
}

/// Breadth-first, single-site crawler bounded by a discovered-URL budget.
pub struct Crawler {
    client: Client,
    max_urls: usize,
    page_timeout: Duration,
    delay: Duration,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_urls: DEFAULT_MAX_URLS,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            delay: DEFAULT_CRAWL_DELAY,
            progress_callback: None,
        }
    }

    pub fn with_options(client: Client, options: &CrawlOptions) -> Self {
        Self::new(client)
            .with_max_urls(options.max_urls)
            .with_page_timeout(options.page_timeout)
            .with_delay(options.delay)
    }

    pub fn with_max_urls(mut self, max_urls: usize) -> Self {
        self.max_urls = max_urls;
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Fixed pause between two consecutive page fetches
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, base_url: &str) -> Result<CrawlResult> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{}: only http and https are supported",
                base_url
            )));
        }

        let seed = urls::normalize(&parsed);
        if self.max_urls == 0 {
            warn!("URL budget is zero, nothing to crawl");
            return Ok(CrawlResult::new(seed.to_string()));
        }
        info!("Starting crawl of {} (max {} URLs)", seed, self.max_urls);

        let mut robots = RobotsGate::allow_all();
        let robots_loaded = robots.load(&self.client, &seed).await;

        let mut state = CrawlState::new(self.max_urls);
        state.discover(&seed);
        let mut queue = VecDeque::from([seed.clone()]);
        let mut fetched_any = false;

        while !state.budget_exhausted() {
            let Some(current) = queue.pop_front() else {
                break;
            };
            let key = current.to_string();

            if state.is_visited(&key) {
                continue;
            }

            if !robots.can_fetch(&key) {
                debug!("Skipped by robots.txt: {}", key);
                state.mark_visited(&key);
                state.skipped_by_robots.push(key);
                continue;
            }

            if fetched_any && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            fetched_any = true;

            if let Some(ref callback) = self.progress_callback {
                callback(state.visited.len(), key.clone());
            }

            debug!("Fetching {}", key);
            let response = match self.send(&current).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Crawl error for {}: {}", key, e);
                    state.mark_visited(&key);
                    state.failures.push(CrawlFailure {
                        url: key,
                        status_code: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            state.mark_visited(&key);

            let status = response.status().as_u16();
            if status != 200 {
                debug!("Status {} for {}", status, key);
                state.failures.push(CrawlFailure {
                    url: key,
                    status_code: Some(status),
                    error: format!("HTTP {}", status),
                });
                continue;
            }

            let final_url = response.url().clone();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read body of {}: {}", key, e);
                    state.failures.push(CrawlFailure {
                        url: key,
                        status_code: Some(status),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            state.categorize(&current);

            let links = extract_site_links(&body, &final_url, &seed);
            for link in links {
                if state.budget_exhausted() {
                    break;
                }
                if state.discover(&link) {
                    queue.push_back(link);
                }
            }
        }

        let mut result = state.into_result(seed.to_string(), robots_loaded);
        result.sitemaps = robots.sitemaps();

        info!(
            "Crawl complete: {} URLs discovered, {} visited",
            result.total_urls, result.visited_urls
        );
        Ok(result)
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.page_timeout)
            .send()
            .await?;
        Ok(response)
    }
}

/// Mutable bookkeeping for a single crawl run
struct CrawlState {
    max_urls: usize,
    discovered: HashSet<String>,
    order: Vec<String>,
    visited: HashSet<String>,
    categorized: HashMap<String, UrlCategory>,
    categories: BTreeMap<UrlCategory, Vec<String>>,
    skipped_by_robots: Vec<String>,
    failures: Vec<CrawlFailure>,
}

impl CrawlState {
    fn new(max_urls: usize) -> Self {
        Self {
            max_urls,
            discovered: HashSet::new(),
            order: Vec::new(),
            visited: HashSet::new(),
            categorized: HashMap::new(),
            categories: crate::result::empty_categories(),
            skipped_by_robots: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.discovered.len() >= self.max_urls
    }

    /// Record a URL as discovered. False when already known or over budget.
    fn discover(&mut self, url: &Url) -> bool {
        if self.budget_exhausted() {
            return false;
        }
        let key = url.to_string();
        if self.discovered.contains(&key) {
            return false;
        }
        self.discovered.insert(key.clone());
        self.order.push(key);
        true
    }

    fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    fn categorize(&mut self, url: &Url) {
        let key = url.to_string();
        if self.categorized.contains_key(&key) {
            return;
        }
        let category = urls::categorize(url);
        self.categorized.insert(key.clone(), category);
        self.categories.entry(category).or_default().push(key);
    }

    fn into_result(self, base_url: String, robots_loaded: bool) -> CrawlResult {
        let mut pages: Vec<DiscoveredUrl> = self
            .order
            .iter()
            .map(|url| DiscoveredUrl {
                url: url.clone(),
                category: self.categorized.get(url).copied(),
                visited: self.visited.contains(url),
            })
            .collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));

        let mut result = CrawlResult::new(base_url);
        result.robots_loaded = robots_loaded;
        result.total_urls = self.discovered.len();
        result.visited_urls = self.visited.len();
        result.categories = self.categories;
        result.urls = pages;
        result.skipped_by_robots = self.skipped_by_robots;
        result.failures = self.failures;
        result
    }
}

/// Same-site anchor targets of a page, normalised, in document order
pub fn extract_site_links(html: &str, page_url: &Url, site: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for element in document.select(&LINK_SELECTOR) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute) = urls::resolve_href(page_url, href)
            && urls::is_same_site(&absolute, site)
        {
            links.push(urls::normalize(&absolute));
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_site_links_filters_and_normalizes() {
        let site = Url::parse("https://shop.test/").unwrap();
        let page = Url::parse("https://shop.test/collections/all").unwrap();
        let html = r##"<html><body>
            <a href="/products/a/">A</a>
            <a href="products/b#reviews">B</a>
            <a href="https://other.test/x">external</a>
            <a href="#top">top</a>
            <a href="mailto:hi@shop.test">mail</a>
            <a>no href</a>
        </body></html>"##;

        let links: Vec<String> = extract_site_links(html, &page, &site)
            .into_iter()
            .map(|u| u.to_string())
            .collect();

        assert_eq!(
            links,
            vec![
                "https://shop.test/products/a".to_string(),
                "https://shop.test/collections/products/b".to_string(),
            ]
        );
    }

    #[test]
    fn test_state_respects_budget() {
        let mut state = CrawlState::new(2);
        let a = Url::parse("https://shop.test/a").unwrap();
        let b = Url::parse("https://shop.test/b").unwrap();
        let c = Url::parse("https://shop.test/c").unwrap();

        assert!(state.discover(&a));
        assert!(!state.discover(&a));
        assert!(state.discover(&b));
        assert!(!state.discover(&c));
        assert_eq!(state.discovered.len(), 2);
    }

    #[test]
    fn test_state_with_zero_budget_discovers_nothing() {
        let mut state = CrawlState::new(0);
        let seed = Url::parse("https://shop.test/").unwrap();

        assert!(!state.discover(&seed));
        assert!(state.discovered.is_empty());
    }
}
