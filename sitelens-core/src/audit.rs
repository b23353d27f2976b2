// Stage runner: each stage reads its inputs from, and writes its output to,
// the artifact store so stages can be run one at a time or back to back.

use crate::artifacts::{Artifact, ArtifactStore};
use crate::error::{AuditError, Result};
use crate::findings::{FindingsGenerator, FindingsReport};
use crate::select::{self, SelectedUrl};
use crate::vitals;
use reqwest::Client;
use sitelens_scanner::crawler::{CrawlOptions, Crawler, ProgressCallback};
use sitelens_scanner::http::{self, HttpOptions};
use sitelens_scanner::onpage::{AnalysisCallback, OnPageAnalyzer};
use sitelens_scanner::pagespeed::{self, PageSpeedClient};
use sitelens_scanner::result::{CrawlResult, PageAnalysis, PagePerformance};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub output_dir: PathBuf,
    pub crawl: CrawlOptions,
    pub target: usize,
    pub api_key: Option<String>,
    pub pagespeed_endpoint: String,
    pub pagespeed_pause: Duration,
    pub http: HttpOptions,
}

impl AuditConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            crawl: CrawlOptions::default(),
            target: select::DEFAULT_TARGET,
            api_key: None,
            pagespeed_endpoint: pagespeed::PAGESPEED_ENDPOINT.to_string(),
            pagespeed_pause: pagespeed::DEFAULT_PAUSE,
            http: HttpOptions::default(),
        }
    }

    /// Explicit key first, then the environment. Blank values count as unset.
    pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
        explicit
            .or_else(|| std::env::var(pagespeed::API_KEY_ENV).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// What a full pipeline run produced
#[derive(Debug, Clone)]
pub struct AuditSummary {
    pub crawl: CrawlResult,
    pub selected: Vec<SelectedUrl>,
    pub performance: Option<BTreeMap<String, PagePerformance>>,
    pub onpage: BTreeMap<String, PageAnalysis>,
    pub findings: FindingsReport,
}

pub struct Audit {
    config: AuditConfig,
    store: ArtifactStore,
    client: Client,
    crawl_progress: Option<ProgressCallback>,
    page_progress: Option<AnalysisCallback>,
}

impl Audit {
    pub fn new(config: AuditConfig) -> Result<Self> {
        let client = http::build_client(&config.http)?;
        let store = ArtifactStore::new(config.output_dir.clone());
        Ok(Self {
            config,
            store,
            client,
            crawl_progress: None,
            page_progress: None,
        })
    }

    pub fn with_crawl_progress(mut self, callback: ProgressCallback) -> Self {
        self.crawl_progress = Some(callback);
        self
    }

    /// Progress for the per-page stages (performance and on-page)
    pub fn with_page_progress(mut self, callback: AnalysisCallback) -> Self {
        self.page_progress = Some(callback);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub async fn crawl(&self, base_url: &str) -> Result<CrawlResult> {
        let mut crawler = Crawler::with_options(self.client.clone(), &self.config.crawl);
        if let Some(ref callback) = self.crawl_progress {
            crawler = crawler.with_progress_callback(callback.clone());
        }

        let result = crawler.crawl(base_url).await?;
        self.store.save_crawl(&result)?;
        Ok(result)
    }

    pub fn select(&self) -> Result<Vec<SelectedUrl>> {
        let crawl = self.store.load_crawl()?;
        let selected = select::select(&crawl.categories, self.config.target);
        self.store.save_selection(&selected)?;
        info!("Selected {} URLs for analysis", selected.len());
        Ok(selected)
    }

    pub async fn performance(&self) -> Result<BTreeMap<String, PagePerformance>> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or(AuditError::MissingApiKey(pagespeed::API_KEY_ENV))?;
        let selected = self.store.load_selection()?;

        let mut client = PageSpeedClient::new(self.client.clone(), api_key)
            .with_endpoint(self.config.pagespeed_endpoint.clone())
            .with_pause(self.config.pagespeed_pause);
        if let Some(ref callback) = self.page_progress {
            client = client.with_progress_callback(callback.clone());
        }

        let run = client
            .measure_all(selected.into_iter().map(|s| (s.url, Some(s.category))))
            .await;

        self.store.save_performance(&run.pages)?;
        self.store.save_vitals(&vitals::summarize(&run.pages))?;
        let saved = self.store.save_raw_reports(&run.raw_reports)?;
        info!("Saved {} raw PageSpeed reports", saved);
        Ok(run.pages)
    }

    pub async fn onpage(&self) -> Result<BTreeMap<String, PageAnalysis>> {
        let selected = self.store.load_selection()?;

        let mut analyzer = OnPageAnalyzer::new(self.client.clone());
        if let Some(ref callback) = self.page_progress {
            analyzer = analyzer.with_progress_callback(callback.clone());
        }

        let results = analyzer
            .analyze_all(selected.iter().map(|s| s.url.as_str()))
            .await;
        self.store.save_onpage(&results)?;
        Ok(results)
    }

    pub fn findings(&self) -> Result<FindingsReport> {
        let performance = self.store.load_performance()?;
        let onpage = self.store.load_onpage()?;

        if performance.is_none() && onpage.is_none() {
            warn!(
                "Neither {} nor {} found; only an empty findings report can be produced",
                Artifact::PerformanceSummary.file_name(),
                Artifact::OnPageAnalysis.file_name()
            );
        }

        let mut generator = FindingsGenerator::new();
        generator.analyze_all(performance.as_ref(), onpage.as_ref());

        let report = FindingsReport::new(generator.into_findings());
        self.store.save_findings(&report)?;
        Ok(report)
    }

    /// Every stage in order. Performance is skipped when no API key is set.
    pub async fn run_all(&self, base_url: &str) -> Result<AuditSummary> {
        let crawl = self.crawl(base_url).await?;
        let selected = self.select()?;

        let performance = if self.config.api_key.is_some() {
            Some(self.performance().await?)
        } else {
            warn!(
                "No PageSpeed Insights API key configured; skipping performance stage (set {})",
                pagespeed::API_KEY_ENV
            );
            None
        };

        let onpage = self.onpage().await?;
        let findings = self.findings()?;

        Ok(AuditSummary {
            crawl,
            selected,
            performance,
            onpage,
            findings,
        })
    }
}
