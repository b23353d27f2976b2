// Tests for artifact persistence between stages

use sitelens_core::artifacts::{Artifact, ArtifactStore, RAW_REPORTS_DIR};
use sitelens_core::error::AuditError;
use sitelens_core::select::SelectedUrl;
use sitelens_scanner::UrlCategory;
use sitelens_scanner::pagespeed::RawReport;
use sitelens_scanner::result::{
    CrawlResult, DiscoveredUrl, PageAnalysis, PagePerformance, PerformanceMetrics, Strategy,
    StrategyOutcome,
};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn store() -> (TempDir, ArtifactStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp_dir.path().join("audit"));
    (temp_dir, store)
}

#[test]
fn test_missing_artifact_names_upstream_command() {
    let (_temp_dir, store) = store();

    let err = store.load_crawl().unwrap_err();
    assert!(matches!(
        err,
        AuditError::MissingArtifact {
            command: "crawl",
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("crawl_results.json"));
    assert!(message.contains("sitelens crawl"));

    let err = store.load_selection().unwrap_err();
    assert!(err.to_string().contains("sitelens select"));
}

#[test]
fn test_optional_artifacts_absent_are_none() {
    let (_temp_dir, store) = store();

    assert!(store.load_performance().unwrap().is_none());
    assert!(store.load_onpage().unwrap().is_none());
}

#[test]
fn test_crawl_results_round_trip_through_disk() {
    let (_temp_dir, store) = store();

    let mut result = CrawlResult::new("https://shop.test/".to_string());
    result.robots_loaded = true;
    result.total_urls = 2;
    result.visited_urls = 2;
    result
        .categories
        .get_mut(&UrlCategory::Home)
        .unwrap()
        .push("https://shop.test/".to_string());
    result.urls.push(DiscoveredUrl {
        url: "https://shop.test/".to_string(),
        category: Some(UrlCategory::Home),
        visited: true,
    });
    result.skipped_by_robots.push("https://shop.test/admin".to_string());

    let path = store.save_crawl(&result).unwrap();
    assert!(path.ends_with("crawl_results.json"));
    assert!(store.exists(Artifact::CrawlResults));

    let loaded = store.load_crawl().unwrap();
    assert_eq!(loaded.base_url, result.base_url);
    assert_eq!(loaded.urls, result.urls);
    assert_eq!(loaded.urls_in(UrlCategory::Home).len(), 1);
    assert_eq!(loaded.categories.len(), UrlCategory::ALL.len());
    assert_eq!(loaded.skipped_by_robots, result.skipped_by_robots);
}

#[test]
fn test_crawl_artifact_uses_category_names_as_keys() {
    let (_temp_dir, store) = store();
    store
        .save_crawl(&CrawlResult::new("https://shop.test/".to_string()))
        .unwrap();

    let raw = std::fs::read_to_string(store.path(Artifact::CrawlResults)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["categories"]["home"].is_array());
    assert!(json["categories"]["checkout"].is_array());
}

#[test]
fn test_selection_and_analysis_round_trip() {
    let (_temp_dir, store) = store();

    let selected = vec![SelectedUrl {
        url: "https://shop.test/".to_string(),
        category: UrlCategory::Home,
    }];
    store.save_selection(&selected).unwrap();
    assert_eq!(store.load_selection().unwrap(), selected);

    let mut onpage = BTreeMap::new();
    onpage.insert(
        "https://shop.test/".to_string(),
        PageAnalysis::with_error(
            "https://shop.test/".to_string(),
            Some(503),
            "HTTP 503".to_string(),
        ),
    );
    store.save_onpage(&onpage).unwrap();
    assert_eq!(store.load_onpage().unwrap().unwrap(), onpage);

    let mut performance = BTreeMap::new();
    performance.insert(
        "https://shop.test/".to_string(),
        PagePerformance {
            url: "https://shop.test/".to_string(),
            category: Some(UrlCategory::Home),
            mobile: StrategyOutcome::Ok(PerformanceMetrics {
                performance_score: Some(45),
                lcp: Some(3.1),
                ..Default::default()
            }),
            desktop: StrategyOutcome::Error {
                message: "timeout".to_string(),
            },
        },
    );
    store.save_performance(&performance).unwrap();
    assert_eq!(store.load_performance().unwrap().unwrap(), performance);
}

#[test]
fn test_corrupt_artifact_is_a_json_error() {
    let (_temp_dir, store) = store();
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.path(Artifact::UrlSet), "{ not json").unwrap();

    assert!(matches!(store.load_selection(), Err(AuditError::Json { .. })));
}

#[test]
fn test_raw_reports_are_written_per_strategy() {
    let (_temp_dir, store) = store();
    let reports = vec![
        RawReport {
            url: "https://shop.test/products/a".to_string(),
            strategy: Strategy::Mobile,
            body: serde_json::json!({"lighthouseResult": {}}),
        },
        RawReport {
            url: "https://shop.test/products/a".to_string(),
            strategy: Strategy::Desktop,
            body: serde_json::json!({"lighthouseResult": {}}),
        },
    ];

    assert_eq!(store.save_raw_reports(&reports).unwrap(), 2);

    let dir = store.dir().join(RAW_REPORTS_DIR);
    assert!(dir.join("shop.test_products_a_mobile.json").is_file());
    assert!(dir.join("shop.test_products_a_desktop.json").is_file());
}

#[test]
fn test_raw_reports_with_colliding_stems_are_all_kept() {
    let (_temp_dir, store) = store();
    let report = |url: &str, marker: u32| RawReport {
        url: url.to_string(),
        strategy: Strategy::Mobile,
        body: serde_json::json!({"marker": marker}),
    };
    let reports = vec![
        report("https://shop.test/a?x=1", 1),
        report("https://shop.test/a/x/1", 2),
    ];

    assert_eq!(store.save_raw_reports(&reports).unwrap(), 2);

    let dir = store.dir().join(RAW_REPORTS_DIR);
    let first = std::fs::read_to_string(dir.join("shop.test_a_x_1_mobile.json")).unwrap();
    let second = std::fs::read_to_string(dir.join("shop.test_a_x_1_mobile_2.json")).unwrap();
    assert!(first.contains("\"marker\": 1"));
    assert!(second.contains("\"marker\": 2"));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);
}
