// Tests for the Core Web Vitals rollup

use sitelens_core::vitals::{self, RatingCounts, Vital};
use sitelens_scanner::UrlCategory;
use sitelens_scanner::result::{PagePerformance, PerformanceMetrics, StrategyOutcome};
use std::collections::BTreeMap;

fn page(url: &str, category: Option<UrlCategory>, mobile: PerformanceMetrics) -> PagePerformance {
    PagePerformance {
        url: url.to_string(),
        category,
        mobile: StrategyOutcome::Ok(mobile),
        desktop: StrategyOutcome::Error {
            message: "timeout".to_string(),
        },
    }
}

fn mobile(score: u32, lcp: f64, ttfb: Option<f64>) -> PerformanceMetrics {
    PerformanceMetrics {
        performance_score: Some(score),
        lcp: Some(lcp),
        ttfb,
        ..Default::default()
    }
}

fn results(pages: Vec<PagePerformance>) -> BTreeMap<String, PagePerformance> {
    pages.into_iter().map(|p| (p.url.clone(), p)).collect()
}

#[test]
fn test_averages_and_ratings_per_page_type() {
    let pages = results(vec![
        page("https://shop.test/", Some(UrlCategory::Home), mobile(60, 5.0, Some(0.5))),
        page(
            "https://shop.test/products/a",
            Some(UrlCategory::Product),
            mobile(30, 2.0, Some(2.0)),
        ),
        page(
            "https://shop.test/products/b",
            Some(UrlCategory::Product),
            mobile(50, 3.0, None),
        ),
    ]);

    let summary = vitals::summarize(&pages);

    assert_eq!(summary.pages_analyzed, 3);
    let product = &summary.categories[&UrlCategory::Product];
    assert_eq!(product.page_count, 2);
    assert_eq!(product.mobile.averages.performance_score, Some(40.0));
    assert_eq!(product.mobile.averages.lcp, Some(2.5));
    assert_eq!(product.mobile.averages.ttfb, Some(2.0));
    assert_eq!(
        product.mobile.ratings[&Vital::Lcp],
        RatingCounts {
            good: 1,
            needs_improvement: 1,
            poor: 0,
        }
    );
    assert_eq!(product.mobile.ratings[&Vital::Ttfb].poor, 1);
    assert!(!product.mobile.ratings.contains_key(&Vital::Cls));
    assert_eq!(product.desktop.averages.performance_score, None);
}

#[test]
fn test_minor_page_types_roll_into_other() {
    let pages = results(vec![
        page("https://shop.test/cart", Some(UrlCategory::Cart), mobile(70, 1.0, None)),
        page("https://shop.test/pages/about", None, mobile(90, 1.5, None)),
    ]);

    let summary = vitals::summarize(&pages);

    assert_eq!(summary.categories.len(), 1);
    assert_eq!(summary.categories[&UrlCategory::Other].page_count, 2);
    assert_eq!(summary.weighted_mobile_score, None);
}

#[test]
fn test_pages_without_metrics_are_skipped() {
    let mut failed = page("https://shop.test/", Some(UrlCategory::Home), mobile(0, 0.0, None));
    failed.mobile = StrategyOutcome::Error {
        message: "HTTP 500".to_string(),
    };

    let summary = vitals::summarize(&results(vec![failed]));

    assert_eq!(summary.pages_analyzed, 0);
    assert!(summary.categories.is_empty());
    assert!(summary.worst_mobile.is_empty());
}

#[test]
fn test_worst_mobile_page_per_vital() {
    let pages = results(vec![
        page("https://shop.test/", Some(UrlCategory::Home), mobile(60, 9.5, None)),
        page(
            "https://shop.test/collections/all",
            Some(UrlCategory::Category),
            mobile(40, 4.2, Some(1.1)),
        ),
    ]);

    let summary = vitals::summarize(&pages);

    let lcp = &summary.worst_mobile[&Vital::Lcp];
    assert_eq!(lcp.url, "https://shop.test/");
    assert_eq!(lcp.category, UrlCategory::Home);
    assert_eq!(lcp.value, 9.5);
    assert_eq!(
        summary.worst_mobile[&Vital::Ttfb].url,
        "https://shop.test/collections/all"
    );
    assert!(summary.worst_desktop.is_empty());
}

#[test]
fn test_weighted_mobile_score_uses_traffic_weights() {
    let pages = results(vec![
        page("https://shop.test/", Some(UrlCategory::Home), mobile(60, 2.0, None)),
        page(
            "https://shop.test/products/a",
            Some(UrlCategory::Product),
            mobile(40, 2.0, None),
        ),
        page(
            "https://shop.test/collections/all",
            Some(UrlCategory::Category),
            mobile(50, 2.0, None),
        ),
    ]);

    // 0.17 * 60 + 0.40 * 40 + 0.43 * 50
    assert_eq!(vitals::summarize(&pages).weighted_mobile_score, Some(47.7));
}

#[test]
fn test_weighted_mobile_score_renormalizes_missing_types() {
    let pages = results(vec![
        page("https://shop.test/", Some(UrlCategory::Home), mobile(60, 2.0, None)),
        page(
            "https://shop.test/products/a",
            Some(UrlCategory::Product),
            mobile(40, 2.0, None),
        ),
    ]);

    // (0.17 * 60 + 0.40 * 40) / 0.57 = 45.96...
    assert_eq!(vitals::summarize(&pages).weighted_mobile_score, Some(46.0));
}
