// JSON artifacts exchanged between audit stages

use crate::error::{AuditError, Result};
use crate::findings::FindingsReport;
use crate::select::SelectedUrl;
use crate::vitals::VitalsSummary;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sitelens_scanner::pagespeed::{RawReport, raw_report_stem};
use sitelens_scanner::result::{CrawlResult, PageAnalysis, PagePerformance};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RAW_REPORTS_DIR: &str = "perf_runs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CrawlResults,
    UrlSet,
    PerformanceSummary,
    CoreWebVitals,
    OnPageAnalysis,
    Findings,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::CrawlResults => "crawl_results.json",
            Artifact::UrlSet => "url_set.json",
            Artifact::PerformanceSummary => "performance_summary.json",
            Artifact::CoreWebVitals => "core_web_vitals_summary.json",
            Artifact::OnPageAnalysis => "onpage_analysis.json",
            Artifact::Findings => "findings.json",
        }
    }

    /// Subcommand that produces this artifact
    pub fn producer(&self) -> &'static str {
        match self {
            Artifact::CrawlResults => "crawl",
            Artifact::UrlSet => "select",
            Artifact::PerformanceSummary | Artifact::CoreWebVitals => "performance",
            Artifact::OnPageAnalysis => "onpage",
            Artifact::Findings => "findings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Artifact::CrawlResults => "Crawl results",
            Artifact::UrlSet => "URL set",
            Artifact::PerformanceSummary => "Performance summary",
            Artifact::CoreWebVitals => "Core Web Vitals summary",
            Artifact::OnPageAnalysis => "On-page analysis",
            Artifact::Findings => "Findings",
        }
    }
}

/// Artifact files in one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    /// Write pretty-printed JSON, creating the output directory if needed
    pub fn write<T: Serialize + ?Sized>(&self, artifact: Artifact, value: &T) -> Result<PathBuf> {
        let path = self.path(artifact);
        write_json(&path, value)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Read a required artifact; a missing file names the command that makes it
    pub fn read<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<T> {
        let path = self.path(artifact);
        if !path.is_file() {
            return Err(AuditError::MissingArtifact {
                artifact: artifact.label(),
                path,
                command: artifact.producer(),
            });
        }
        read_json(&path)
    }

    /// Read an artifact that later stages can do without
    pub fn read_optional<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Option<T>> {
        let path = self.path(artifact);
        if !path.is_file() {
            debug!("Optional artifact {} not present", path.display());
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn save_crawl(&self, result: &CrawlResult) -> Result<PathBuf> {
        self.write(Artifact::CrawlResults, result)
    }

    pub fn load_crawl(&self) -> Result<CrawlResult> {
        self.read(Artifact::CrawlResults)
    }

    pub fn save_selection(&self, selected: &[SelectedUrl]) -> Result<PathBuf> {
        self.write(Artifact::UrlSet, selected)
    }

    pub fn load_selection(&self) -> Result<Vec<SelectedUrl>> {
        self.read(Artifact::UrlSet)
    }

    pub fn save_performance(&self, pages: &BTreeMap<String, PagePerformance>) -> Result<PathBuf> {
        self.write(Artifact::PerformanceSummary, pages)
    }

    pub fn load_performance(&self) -> Result<Option<BTreeMap<String, PagePerformance>>> {
        self.read_optional(Artifact::PerformanceSummary)
    }

    pub fn save_vitals(&self, summary: &VitalsSummary) -> Result<PathBuf> {
        self.write(Artifact::CoreWebVitals, summary)
    }

    pub fn load_vitals(&self) -> Result<Option<VitalsSummary>> {
        self.read_optional(Artifact::CoreWebVitals)
    }

    pub fn save_onpage(&self, pages: &BTreeMap<String, PageAnalysis>) -> Result<PathBuf> {
        self.write(Artifact::OnPageAnalysis, pages)
    }

    pub fn load_onpage(&self) -> Result<Option<BTreeMap<String, PageAnalysis>>> {
        self.read_optional(Artifact::OnPageAnalysis)
    }

    pub fn save_findings(&self, report: &FindingsReport) -> Result<PathBuf> {
        self.write(Artifact::Findings, report)
    }

    pub fn load_findings(&self) -> Result<FindingsReport> {
        self.read(Artifact::Findings)
    }

    /// Keep the untouched PageSpeed responses next to the summary.
    ///
    /// Stems always end in the strategy name, so a numeric suffix added to a
    /// repeated stem cannot collide with another report's stem.
    pub fn save_raw_reports(&self, reports: &[RawReport]) -> Result<usize> {
        let dir = self.dir.join(RAW_REPORTS_DIR);
        let mut used = HashSet::new();
        for report in reports {
            let stem = raw_report_stem(&report.url, report.strategy);
            let mut name = stem.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", stem, n);
                n += 1;
            }
            write_json(&dir.join(format!("{}.json", name)), &report.body)?;
        }
        Ok(reports.len())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| AuditError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| AuditError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| AuditError::Json {
        path: path.to_path_buf(),
        source,
    })
}
