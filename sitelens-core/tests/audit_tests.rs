// End-to-end stage runs against a mock storefront

use serde_json::json;
use sitelens_core::artifacts::Artifact;
use sitelens_core::audit::{Audit, AuditConfig};
use sitelens_core::error::AuditError;
use sitelens_core::findings::{FindingArea, Priority};
use sitelens_scanner::UrlCategory;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(body.to_string())
}

async fn mount_storefront(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><meta name="description" content="Shop"></head>
            <body><h1>Shop</h1><a href="/collections/all">All</a><a href="/products/a">A</a></body></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .respond_with(html(r#"<h1>All</h1><a href="/products/a">A</a><a href="/cart">Cart</a>"#))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/a"))
        .respond_with(html(
            r#"<h1>A</h1><script type="application/ld+json">{"@type": "Product"}</script>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(html("<h1>Cart</h1>"))
        .mount(server)
        .await;
}

fn config(temp_dir: &TempDir) -> AuditConfig {
    let mut config = AuditConfig::new(temp_dir.path().join("out"));
    config.crawl.delay = Duration::ZERO;
    config.pagespeed_pause = Duration::ZERO;
    config
}

#[tokio::test]
async fn test_full_pipeline_without_api_key() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let temp_dir = TempDir::new().unwrap();

    let audit = Audit::new(config(&temp_dir)).unwrap();
    let summary = audit.run_all(&server.uri()).await.unwrap();

    assert_eq!(summary.crawl.total_urls, 4);
    assert_eq!(summary.crawl.urls_in(UrlCategory::Cart).len(), 1);
    assert_eq!(summary.selected.len(), 4);
    assert_eq!(summary.selected[0].category, UrlCategory::Home);
    assert!(summary.performance.is_none());
    assert_eq!(summary.onpage.len(), 4);
    assert!(summary.onpage.values().all(|p| p.is_ok()));

    let store = audit.store();
    assert!(store.exists(Artifact::CrawlResults));
    assert!(store.exists(Artifact::UrlSet));
    assert!(store.exists(Artifact::OnPageAnalysis));
    assert!(store.exists(Artifact::Findings));
    assert!(!store.exists(Artifact::PerformanceSummary));

    let findings = &summary.findings;
    assert!(findings.findings.iter().all(|f| f.area != FindingArea::Performance));
    assert!(
        findings
            .findings
            .iter()
            .any(|f| f.title == "Missing HSTS Header")
    );
    assert_eq!(findings.priority_matrix.len(), findings.total_findings);
}

#[tokio::test]
async fn test_stages_run_separately() {
    let server = MockServer::start().await;
    mount_storefront(&server).await;
    let temp_dir = TempDir::new().unwrap();

    let mut cfg = config(&temp_dir);
    cfg.target = 2;
    let audit = Audit::new(cfg).unwrap();

    audit.crawl(&server.uri()).await.unwrap();
    let selected = audit.select().unwrap();
    assert_eq!(selected.len(), 2);

    let onpage = audit.onpage().await.unwrap();
    assert_eq!(onpage.len(), 2);

    let report = audit.findings().unwrap();
    let reloaded = audit.store().load_findings().unwrap();
    assert_eq!(reloaded.total_findings, report.total_findings);
}

#[tokio::test]
async fn test_select_before_crawl_fails_with_hint() {
    let temp_dir = TempDir::new().unwrap();
    let audit = Audit::new(config(&temp_dir)).unwrap();

    let err = audit.select().unwrap_err();
    assert!(matches!(err, AuditError::MissingArtifact { command: "crawl", .. }));
}

#[tokio::test]
async fn test_performance_requires_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let audit = Audit::new(config(&temp_dir)).unwrap();

    assert!(matches!(
        audit.performance().await,
        Err(AuditError::MissingApiKey(_))
    ));
}

#[tokio::test]
async fn test_performance_stage_feeds_findings() {
    let site = MockServer::start().await;
    mount_storefront(&site).await;
    let psi = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/runPagespeed"))
        .and(query_param("key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lighthouseResult": {
                "categories": {"performance": {"score": 0.45}},
                "audits": {"largest-contentful-paint": {"numericValue": 2100.0}}
            }
        })))
        .mount(&psi)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut cfg = config(&temp_dir);
    cfg.api_key = Some("secret".to_string());
    cfg.pagespeed_endpoint = format!("{}/runPagespeed", psi.uri());
    cfg.target = 1;
    let audit = Audit::new(cfg).unwrap();

    audit.crawl(&site.uri()).await.unwrap();
    audit.select().unwrap();
    let performance = audit.performance().await.unwrap();
    assert_eq!(performance.len(), 1);
    assert!(audit.store().dir().join("perf_runs").is_dir());

    let vitals = audit.store().load_vitals().unwrap().unwrap();
    assert_eq!(vitals.pages_analyzed, 1);
    assert_eq!(vitals.weighted_mobile_score, Some(45.0));
    assert_eq!(vitals.categories[&UrlCategory::Home].mobile.averages.lcp, Some(2.1));

    let report = audit.findings().unwrap();
    let low_scores = report
        .findings
        .iter()
        .find(|f| f.title == "Low PageSpeed Performance Scores")
        .unwrap();
    assert_eq!(low_scores.priority, Priority::High);
}

#[test]
fn test_resolve_api_key_prefers_explicit_value() {
    assert_eq!(
        AuditConfig::resolve_api_key(Some("explicit".to_string())),
        Some("explicit".to_string())
    );
    assert_eq!(AuditConfig::resolve_api_key(Some("   ".to_string())), None);
}
