// Plain-text console summaries of audit artifacts

use crate::findings::{FindingBasis, FindingsReport, Priority};
use crate::select::{self, SelectedUrl};
use crate::vitals::{Vital, VitalsSummary};
use sitelens_scanner::UrlCategory;
use sitelens_scanner::result::{CrawlResult, PageAnalysis, PagePerformance, StrategyOutcome};
use std::collections::BTreeMap;

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const LIGHT_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";

pub fn crawl_summary(result: &CrawlResult) -> String {
    let mut report = String::new();

    report.push_str(&format!("Base URL:     {}\n", result.base_url));
    report.push_str(&format!(
        "robots.txt:   {}\n",
        if result.robots_loaded { "loaded" } else { "not found (all URLs allowed)" }
    ));
    report.push_str(&format!("Discovered:   {}\n", result.total_urls));
    report.push_str(&format!("Visited:      {}\n", result.visited_urls));
    if !result.skipped_by_robots.is_empty() {
        report.push_str(&format!("Disallowed:   {}\n", result.skipped_by_robots.len()));
    }
    if !result.failures.is_empty() {
        report.push_str(&format!("Failed:       {}\n", result.failures.len()));
    }
    report.push('\n');

    report.push_str("URLs by category:\n");
    for category in UrlCategory::ALL {
        let count = result.urls_in(category).len();
        if count > 0 {
            report.push_str(&format!("  {:<10} {}\n", category.as_str(), count));
        }
    }

    report
}

pub fn selection_summary(selected: &[SelectedUrl]) -> String {
    let mut report = String::new();

    report.push_str(&format!("Selected {} URLs\n", selected.len()));
    for (category, count) in select::count_by_category(selected) {
        report.push_str(&format!("  {:<10} {}\n", category.as_str(), count));
    }
    report.push('\n');

    for (idx, item) in selected.iter().enumerate() {
        report.push_str(&format!("{:>3}. {} ({})\n", idx + 1, item.url, item.category));
    }

    report
}

pub fn performance_summary(pages: &BTreeMap<String, PagePerformance>) -> String {
    let mut report = String::new();

    report.push_str(&format!("{:<8} {:<8} {:<8} URL\n", "MOBILE", "DESKTOP", "LCP(m)"));
    for (url, page) in pages {
        let lcp = page
            .mobile
            .metrics()
            .and_then(|m| m.lcp)
            .map(|l| format!("{:.1}s", l))
            .unwrap_or_else(|| "-".to_string());
        report.push_str(&format!(
            "{:<8} {:<8} {:<8} {}\n",
            format_score(&page.mobile),
            format_score(&page.desktop),
            lcp,
            url
        ));
    }

    report
}

/// Mobile Core Web Vitals per page type, each average with its rating
pub fn vitals_summary(summary: &VitalsSummary) -> String {
    let mut report = String::new();

    report.push_str(&format!(
        "{:<10} {:<6} {:<24} {:<24} {:<24}\n",
        "TYPE", "PAGES", "LCP(m)", "CLS(m)", "TTFB(m)"
    ));
    for (category, vitals) in &summary.categories {
        let averages = &vitals.mobile.averages;
        report.push_str(&format!(
            "{:<10} {:<6} {:<24} {:<24} {:<24}\n",
            category.as_str(),
            vitals.page_count,
            rated(Vital::Lcp, averages.lcp, "s"),
            rated(Vital::Cls, averages.cls, ""),
            rated(Vital::Ttfb, averages.ttfb, "s"),
        ));
    }

    if let Some(score) = summary.weighted_mobile_score {
        report.push_str(&format!("\nWeighted mobile score: {:.1}/100\n", score));
    }

    report
}

fn rated(vital: Vital, value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{} ({})", v, unit, vital.rate(v).as_str()),
        None => "-".to_string(),
    }
}

pub fn onpage_summary(pages: &BTreeMap<String, PageAnalysis>) -> String {
    let mut report = String::new();

    let failed = pages.values().filter(|p| !p.is_ok()).count();
    report.push_str(&format!(
        "Analyzed {} URLs ({} failed)\n\n",
        pages.len(),
        failed
    ));

    for (url, page) in pages {
        match page.error {
            Some(ref error) => {
                report.push_str(&format!("  ✗ {}  [{}]\n", url, error));
            }
            None => {
                report.push_str(&format!(
                    "  ✓ {}  [h1: {}, schema: {}, security headers: {}]\n",
                    url,
                    page.headings.h1,
                    page.schema.len(),
                    page.security_headers.len()
                ));
            }
        }
    }

    report
}

pub fn findings_report(data: &FindingsReport) -> String {
    let mut report = String::new();

    report.push_str(HEAVY_RULE);
    report.push_str("                         SITELENS AUDIT FINDINGS\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    report.push_str(&format!("Generated:      {}\n", data.generated_at));
    report.push_str(&format!("Total Findings: {}\n\n", data.total_findings));

    report.push_str(HEAVY_RULE);
    report.push_str("PRIORITY MATRIX\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    for priority in Priority::ALL {
        let findings = data.priority_matrix.get(priority);
        report.push_str(&format!(
            "  [{}] {}\n",
            priority.as_str().to_uppercase(),
            findings.len()
        ));
        for finding in findings {
            report.push_str(&format!("      - {}\n", finding.title));
        }
    }
    report.push('\n');

    if !data.findings.is_empty() {
        report.push_str(HEAVY_RULE);
        report.push_str("DETAILED FINDINGS\n");
        report.push_str(HEAVY_RULE);
        report.push('\n');

        for (idx, finding) in data.findings.iter().enumerate() {
            report.push_str(&format!("[{}] {}\n", idx + 1, finding.title));
            report.push_str(&format!("Priority:     {}\n", finding.priority));
            report.push_str(&format!("Area:         {}\n", finding.area.as_str()));
            if finding.basis == FindingBasis::Editorial {
                report.push_str("Basis:        editorial (not derived from measurements)\n");
            }
            report.push_str(&format!("Effort:       {}\n", finding.effort));

            report.push_str("\nDescription:\n");
            report.push_str(&wrap_text(&finding.description, 80, "  "));
            report.push_str("\nImpact:\n");
            report.push_str(&wrap_text(&finding.impact, 80, "  "));
            report.push_str("\nRecommendation:\n");
            report.push_str(&wrap_text(&finding.recommendation, 80, "  "));

            if !finding.evidence.is_empty() {
                report.push_str("\nEvidence:\n");
                for item in &finding.evidence {
                    report.push_str(&format!("  - {}\n", item));
                }
            }

            report.push('\n');
            report.push_str(LIGHT_RULE);
            report.push('\n');
        }
    }

    report
}

fn format_score(outcome: &StrategyOutcome) -> String {
    match outcome {
        StrategyOutcome::Ok(metrics) => metrics
            .performance_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        StrategyOutcome::Error { .. } => "error".to_string(),
    }
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}
