// Rule-based audit findings and the priority matrix

use serde::{Deserialize, Serialize};
use sitelens_scanner::result::{PageAnalysis, PagePerformance};
use sitelens_scanner::UrlCategory;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

pub const SEO_EVIDENCE_LIMIT: usize = 10;
pub const SECURITY_EVIDENCE_LIMIT: usize = 5;
pub const PERFORMANCE_EVIDENCE_LIMIT: usize = 5;
pub const SOCIAL_EVIDENCE_LIMIT: usize = 5;

const LOW_SCORE: u32 = 50;
const HIGH_PRIORITY_AVERAGE: f64 = 50.0;
const MEDIUM_PRIORITY_AVERAGE: f64 = 70.0;
const POOR_LCP_SECS: f64 = 4.0;
const POOR_CLS: f64 = 0.25;
const POOR_TTI_SECS: f64 = 10.0;
const EXTREME_HOME_LCP_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingArea {
    Performance,
    Seo,
    Security,
    Compliance,
    Social,
}

impl FindingArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingArea::Performance => "performance",
            FindingArea::Seo => "seo",
            FindingArea::Security => "security",
            FindingArea::Compliance => "compliance",
            FindingArea::Social => "social",
        }
    }
}

/// Whether a finding was computed from measurements or is authored text
/// emitted regardless of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingBasis {
    Measured,
    Editorial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    pub impact: String,
    pub priority: Priority,
    pub recommendation: String,
    pub effort: String,
    pub evidence: Vec<String>,
    pub area: FindingArea,
    pub basis: FindingBasis,
}

/// Findings grouped by priority. Every finding lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityMatrix {
    #[serde(rename = "High")]
    pub high: Vec<Finding>,
    #[serde(rename = "Medium")]
    pub medium: Vec<Finding>,
    #[serde(rename = "Low")]
    pub low: Vec<Finding>,
}

impl PriorityMatrix {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut matrix = Self::default();
        for finding in findings {
            let bucket = match finding.priority {
                Priority::High => &mut matrix.high,
                Priority::Medium => &mut matrix.medium,
                Priority::Low => &mut matrix.low,
            };
            bucket.push(finding.clone());
        }
        matrix
    }

    pub fn get(&self, priority: Priority) -> &[Finding] {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The persisted form of one findings run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsReport {
    pub generated_at: String,
    pub generator_version: String,
    pub total_findings: usize,
    pub findings: Vec<Finding>,
    pub priority_matrix: PriorityMatrix,
}

impl FindingsReport {
    pub fn new(findings: Vec<Finding>) -> Self {
        let priority_matrix = PriorityMatrix::from_findings(&findings);
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            total_findings: findings.len(),
            findings,
            priority_matrix,
        }
    }
}

/// Accumulates findings over one audit run.
#[derive(Debug, Default)]
pub struct FindingsGenerator {
    findings: Vec<Finding>,
}

impl FindingsGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_finding(&mut self, finding: Finding) {
        debug!("Finding [{}] {}", finding.priority, finding.title);
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn priority_matrix(&self) -> PriorityMatrix {
        PriorityMatrix::from_findings(&self.findings)
    }

    pub fn analyze_performance(&mut self, results: &BTreeMap<String, PagePerformance>) {
        if results.is_empty() {
            return;
        }

        let mut low_score_pages = Vec::new();
        let mut mobile_scores = Vec::new();
        let mut desktop_scores = Vec::new();
        let mut home_lcp = None;

        for (url, page) in results {
            if let Some(mobile) = page.mobile.metrics() {
                if let Some(score) = mobile.performance_score {
                    mobile_scores.push(score as f64);
                    if score < LOW_SCORE {
                        low_score_pages.push(format!("{} ({} on mobile)", url, score));
                    }
                }
                if is_home(url, page.category) {
                    home_lcp = mobile.lcp;
                }
            }

            if let Some(desktop) = page.desktop.metrics()
                && let Some(score) = desktop.performance_score
            {
                desktop_scores.push(score as f64);
                if score < LOW_SCORE {
                    low_score_pages.push(format!("{} ({} on desktop)", url, score));
                }
            }
        }

        if let Some(lcp) = home_lcp
            && lcp > EXTREME_HOME_LCP_SECS
        {
            self.add_finding(Finding {
                title: "Oversized Hero Media Causes Extreme LCP".to_string(),
                description: format!(
                    "The home page reaches its Largest Contentful Paint after {:.1}s on mobile (recommended: under 2.5s).",
                    lcp
                ),
                impact: "Heavy above-the-fold images delay LCP and consume mobile bandwidth, hurting Core Web Vitals and first impressions.".to_string(),
                priority: Priority::High,
                recommendation: "Compress hero images, serve responsive WebP variants through srcset and cap hero width at 1920px.".to_string(),
                effort: "4-8 hours".to_string(),
                evidence: vec![format!("Mobile LCP: {:.1}s", lcp)],
                area: FindingArea::Performance,
                basis: FindingBasis::Measured,
            });
        }

        self.add_finding(Finding {
            title: "Multiple Tracking Scripts Loaded Together".to_string(),
            description: "Several analytics and advertising tags are loaded in the document head at the same time.".to_string(),
            impact: "Each tag adds download and execution time, delays Time to Interactive and may set cookies before consent is given.".to_string(),
            priority: Priority::High,
            recommendation: "Review which tags are needed, consolidate analytics, load the rest asynchronously and only after cookie consent.".to_string(),
            effort: "6-12 hours".to_string(),
            evidence: vec![
                "Google Tag Manager".to_string(),
                "Facebook Pixel".to_string(),
                "Platform analytics".to_string(),
            ],
            area: FindingArea::Performance,
            basis: FindingBasis::Editorial,
        });

        if let Some(mobile_avg) = mean(&mobile_scores)
            && (mobile_avg < MEDIUM_PRIORITY_AVERAGE || !low_score_pages.is_empty())
        {
            let priority = if mobile_avg < HIGH_PRIORITY_AVERAGE {
                Priority::High
            } else {
                Priority::Medium
            };
            let desktop_avg = mean(&desktop_scores)
                .map(|d| format!("{:.1}/100", d))
                .unwrap_or_else(|| "n/a".to_string());

            let mut evidence = vec![format!("Mobile average score: {:.1}/100", mobile_avg)];
            evidence.extend(
                low_score_pages
                    .iter()
                    .take(PERFORMANCE_EVIDENCE_LIMIT)
                    .cloned(),
            );

            self.add_finding(Finding {
                title: "Low PageSpeed Performance Scores".to_string(),
                description: format!(
                    "Pages score poorly on PageSpeed Insights. Mobile average: {:.1}/100, desktop average: {}.",
                    mobile_avg, desktop_avg
                ),
                impact: "Slow pages raise bounce rates and weigh on search rankings.".to_string(),
                priority,
                recommendation: "Optimize images, lazy-load offscreen media, minify CSS and JS, enable caching and cut render-blocking resources.".to_string(),
                effort: "8-16 hours".to_string(),
                evidence,
                area: FindingArea::Performance,
                basis: FindingBasis::Measured,
            });
        }

        let mut poor_vitals = Vec::new();
        for (url, page) in results {
            let Some(mobile) = page.mobile.metrics() else {
                continue;
            };
            if let Some(lcp) = mobile.lcp
                && lcp > POOR_LCP_SECS
            {
                poor_vitals.push(format!("{}: LCP={:.2}s", url, lcp));
            }
            if let Some(cls) = mobile.cls
                && cls > POOR_CLS
            {
                poor_vitals.push(format!("{}: CLS={:.3}", url, cls));
            }
            if let Some(tti) = mobile.tti
                && tti > POOR_TTI_SECS
            {
                poor_vitals.push(format!("{}: TTI={:.2}s", url, tti));
            }
        }

        if !poor_vitals.is_empty() {
            poor_vitals.truncate(PERFORMANCE_EVIDENCE_LIMIT);
            self.add_finding(Finding {
                title: "Poor Core Web Vitals".to_string(),
                description: "Pages exceed Core Web Vitals thresholds (LCP > 4s, CLS > 0.25, TTI > 10s) on mobile.".to_string(),
                impact: "Failing Core Web Vitals hurts search rankings and user experience.".to_string(),
                priority: Priority::High,
                recommendation: "Improve server response time, optimize and preload key images, and reserve space for media and embeds to avoid layout shifts.".to_string(),
                effort: "12-20 hours".to_string(),
                evidence: poor_vitals,
                area: FindingArea::Performance,
                basis: FindingBasis::Measured,
            });
        }

        self.add_finding(Finding {
            title: "Render-Blocking JavaScript".to_string(),
            description: "Theme and app bundles are loaded synchronously in the document head.".to_string(),
            impact: "Synchronous scripts block the first render and push back First Contentful Paint and Time to Interactive.".to_string(),
            priority: Priority::Medium,
            recommendation: "Add defer or async to non-critical scripts, or move them to the end of the body.".to_string(),
            effort: "4-8 hours".to_string(),
            evidence: vec!["vendor.min.js".to_string(), "app.min.js".to_string()],
            area: FindingArea::Performance,
            basis: FindingBasis::Editorial,
        });

        self.add_finding(Finding {
            title: "Custom Fonts Block Rendering".to_string(),
            description: "Web fonts are loaded from third-party origins without preloading.".to_string(),
            impact: "Font requests without preload delay text rendering and add download time.".to_string(),
            priority: Priority::Medium,
            recommendation: "Limit the site to one or two font families and preload only the critical styles with <link rel=\"preload\">.".to_string(),
            effort: "2-4 hours".to_string(),
            evidence: vec!["Web fonts loaded without preload".to_string()],
            area: FindingArea::Performance,
            basis: FindingBasis::Editorial,
        });
    }

    pub fn analyze_seo(&mut self, results: &BTreeMap<String, PageAnalysis>) {
        if results.is_empty() {
            return;
        }

        let mut missing_description = Vec::new();
        let mut heading_issues = Vec::new();
        let mut missing_canonical = Vec::new();
        let mut missing_schema = Vec::new();

        for (url, page) in successful(results) {
            if !page.meta_tags.contains_key("description") {
                missing_description.push(url.clone());
            }

            if page.headings.h1 > 1 {
                heading_issues.push(url.clone());
            } else if page.headings.h1 == 0 {
                heading_issues.push(format!("{} (missing H1)", url));
            }

            if page.canonical.as_deref().is_none_or(str::is_empty) {
                missing_canonical.push(url.clone());
            }

            if page.schema.is_empty() {
                missing_schema.push(url.clone());
            }
        }

        if !missing_description.is_empty() {
            self.add_finding(Finding {
                title: "Missing Meta Descriptions".to_string(),
                description: format!(
                    "{} pages are missing meta descriptions.",
                    missing_description.len()
                ),
                impact: "Reduced click-through rates from search results, missed SEO opportunity.".to_string(),
                priority: Priority::Medium,
                recommendation: "Add unique, compelling meta descriptions (150-160 characters) to all pages.".to_string(),
                effort: "4-8 hours".to_string(),
                evidence: capped(missing_description, SEO_EVIDENCE_LIMIT),
                area: FindingArea::Seo,
                basis: FindingBasis::Measured,
            });
        }

        if !heading_issues.is_empty() {
            self.add_finding(Finding {
                title: "Heading Structure Issues".to_string(),
                description: format!(
                    "{} pages have heading structure problems (multiple H1s or missing H1).",
                    heading_issues.len()
                ),
                impact: "Poor SEO structure, confusion for search engines.".to_string(),
                priority: Priority::Medium,
                recommendation: "Ensure each page has exactly one H1 tag, followed by a proper H2-H6 hierarchy.".to_string(),
                effort: "6-12 hours".to_string(),
                evidence: capped(heading_issues, SEO_EVIDENCE_LIMIT),
                area: FindingArea::Seo,
                basis: FindingBasis::Measured,
            });
        }

        if !missing_canonical.is_empty() {
            self.add_finding(Finding {
                title: "Missing Canonical Tags".to_string(),
                description: format!(
                    "{} pages are missing canonical tags.",
                    missing_canonical.len()
                ),
                impact: "Risk of duplicate content issues, diluted SEO value.".to_string(),
                priority: Priority::Medium,
                recommendation: "Add canonical tags to all pages pointing to the preferred URL version.".to_string(),
                effort: "2-4 hours".to_string(),
                evidence: capped(missing_canonical, SEO_EVIDENCE_LIMIT),
                area: FindingArea::Seo,
                basis: FindingBasis::Measured,
            });
        }

        if !missing_schema.is_empty() {
            self.add_finding(Finding {
                title: "Missing Schema Markup".to_string(),
                description: format!(
                    "{} pages are missing structured data (schema.org markup).",
                    missing_schema.len()
                ),
                impact: "Missed opportunity for rich snippets in search results, reduced visibility.".to_string(),
                priority: Priority::High,
                recommendation: "Implement appropriate schema types: Organization, Product, BreadcrumbList, LocalBusiness.".to_string(),
                effort: "16-24 hours".to_string(),
                evidence: capped(missing_schema, SEO_EVIDENCE_LIMIT),
                area: FindingArea::Seo,
                basis: FindingBasis::Measured,
            });
        }
    }

    pub fn analyze_security(&mut self, results: &BTreeMap<String, PageAnalysis>) {
        if results.is_empty() {
            return;
        }

        let mut missing_hsts = Vec::new();
        let mut missing_frame_options = Vec::new();
        let mut missing_content_type_options = Vec::new();
        let mut mixed_content = Vec::new();
        let mut plain_http = Vec::new();

        for (url, page) in successful(results) {
            let headers = &page.security_headers;
            if !headers.contains_key("strict-transport-security") {
                missing_hsts.push(url.clone());
            }
            if !headers.contains_key("x-frame-options") {
                missing_frame_options.push(url.clone());
            }
            if !headers.contains_key("x-content-type-options") {
                missing_content_type_options.push(url.clone());
            }
            if page.mixed_content {
                mixed_content.push(url.clone());
            }
            if !page.https_redirect && url.starts_with("http://") {
                plain_http.push(url.clone());
            }
        }

        if !missing_hsts.is_empty() {
            self.add_finding(Finding {
                title: "Missing HSTS Header".to_string(),
                description: format!(
                    "HSTS (HTTP Strict Transport Security) header is missing on {} pages.",
                    missing_hsts.len()
                ),
                impact: "Increased risk of man-in-the-middle attacks, security best practice not followed.".to_string(),
                priority: Priority::High,
                recommendation: "Send Strict-Transport-Security with a long max-age (e.g. 31536000 for one year).".to_string(),
                effort: "2-4 hours".to_string(),
                evidence: capped(missing_hsts, SECURITY_EVIDENCE_LIMIT),
                area: FindingArea::Security,
                basis: FindingBasis::Measured,
            });
        }

        if !missing_frame_options.is_empty() || !missing_content_type_options.is_empty() {
            let mut evidence: Vec<String> = Vec::new();
            for url in missing_frame_options
                .iter()
                .chain(missing_content_type_options.iter())
            {
                if !evidence.contains(url) {
                    evidence.push(url.clone());
                }
            }

            self.add_finding(Finding {
                title: "Missing Security Headers".to_string(),
                description: format!(
                    "Security headers are missing: X-Frame-Options ({} pages), X-Content-Type-Options ({} pages).",
                    missing_frame_options.len(),
                    missing_content_type_options.len()
                ),
                impact: "Increased exposure to clickjacking and MIME-type sniffing attacks.".to_string(),
                priority: Priority::High,
                recommendation: "Add X-Frame-Options: DENY or SAMEORIGIN, and X-Content-Type-Options: nosniff.".to_string(),
                effort: "2-4 hours".to_string(),
                evidence: capped(evidence, SECURITY_EVIDENCE_LIMIT),
                area: FindingArea::Security,
                basis: FindingBasis::Measured,
            });
        }

        if !mixed_content.is_empty() {
            self.add_finding(Finding {
                title: "Mixed Content Issues".to_string(),
                description: format!(
                    "{} pages load HTTP resources over HTTPS connections.",
                    mixed_content.len()
                ),
                impact: "Security warnings in browsers, potential blocking of insecure resources.".to_string(),
                priority: Priority::High,
                recommendation: "Update all HTTP URLs to HTTPS or enforce upgrades with a Content Security Policy.".to_string(),
                effort: "4-8 hours".to_string(),
                evidence: capped(mixed_content, SECURITY_EVIDENCE_LIMIT),
                area: FindingArea::Security,
                basis: FindingBasis::Measured,
            });
        }

        if !plain_http.is_empty() {
            self.add_finding(Finding {
                title: "Pages Served Without HTTPS".to_string(),
                description: format!(
                    "{} pages are only reachable over plain HTTP.",
                    plain_http.len()
                ),
                impact: "Traffic can be read and modified in transit; browsers flag the pages as not secure.".to_string(),
                priority: Priority::High,
                recommendation: "Serve every page over HTTPS and redirect HTTP requests to it.".to_string(),
                effort: "2-4 hours".to_string(),
                evidence: capped(plain_http, SECURITY_EVIDENCE_LIMIT),
                area: FindingArea::Security,
                basis: FindingBasis::Measured,
            });
        }
    }

    pub fn analyze_compliance(&mut self, results: &BTreeMap<String, PageAnalysis>) {
        if results.is_empty() {
            return;
        }

        self.add_finding(Finding {
            title: "Legal Compliance Review Needed".to_string(),
            description: "Review required for privacy policy, terms of service, cookie policy and health disclaimers.".to_string(),
            impact: "Legal risk and potential non-compliance with sector regulations.".to_string(),
            priority: Priority::High,
            recommendation: "Ensure all required legal documents are present, accessible and compliant. Add disclaimers to product pages.".to_string(),
            effort: "8-16 hours".to_string(),
            evidence: vec!["Review all legal pages and product disclaimers".to_string()],
            area: FindingArea::Compliance,
            basis: FindingBasis::Editorial,
        });
    }

    pub fn analyze_social(&mut self, results: &BTreeMap<String, PageAnalysis>) {
        if results.is_empty() {
            return;
        }

        let mut missing_og_image = Vec::new();
        let mut missing_twitter_card = Vec::new();

        for (url, page) in successful(results) {
            if !page.open_graph.contains_key("image") {
                missing_og_image.push(url.clone());
            }
            if !page.twitter_card.contains_key("card") {
                missing_twitter_card.push(url.clone());
            }
        }

        if !missing_og_image.is_empty() {
            self.add_finding(Finding {
                title: "Missing Open Graph Images".to_string(),
                description: format!(
                    "{} pages have no og:image tag.",
                    missing_og_image.len()
                ),
                impact: "Shared links render without a preview image, lowering engagement on social platforms.".to_string(),
                priority: Priority::Medium,
                recommendation: "Add og:image (at least 1200x630) along with og:title and og:description to every page.".to_string(),
                effort: "2-4 hours".to_string(),
                evidence: capped(missing_og_image, SOCIAL_EVIDENCE_LIMIT),
                area: FindingArea::Social,
                basis: FindingBasis::Measured,
            });
        }

        if !missing_twitter_card.is_empty() {
            self.add_finding(Finding {
                title: "Missing Twitter Card Tags".to_string(),
                description: format!(
                    "{} pages have no twitter:card tag.",
                    missing_twitter_card.len()
                ),
                impact: "Links shared on X/Twitter fall back to a plain text preview.".to_string(),
                priority: Priority::Low,
                recommendation: "Add twitter:card (summary_large_image) and matching title, description and image tags.".to_string(),
                effort: "1-2 hours".to_string(),
                evidence: capped(missing_twitter_card, SOCIAL_EVIDENCE_LIMIT),
                area: FindingArea::Social,
                basis: FindingBasis::Measured,
            });
        }
    }

    /// Run every pass over whatever inputs are available
    pub fn analyze_all(
        &mut self,
        performance: Option<&BTreeMap<String, PagePerformance>>,
        onpage: Option<&BTreeMap<String, PageAnalysis>>,
    ) {
        if let Some(performance) = performance {
            self.analyze_performance(performance);
        }
        if let Some(onpage) = onpage {
            self.analyze_seo(onpage);
            self.analyze_security(onpage);
            self.analyze_compliance(onpage);
            self.analyze_social(onpage);
        }
    }
}

fn successful(
    results: &BTreeMap<String, PageAnalysis>,
) -> impl Iterator<Item = (&String, &PageAnalysis)> {
    results.iter().filter(|(_, page)| page.is_ok())
}

fn capped(mut items: Vec<String>, limit: usize) -> Vec<String> {
    items.truncate(limit);
    items
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn is_home(url: &str, category: Option<UrlCategory>) -> bool {
    category == Some(UrlCategory::Home)
        || Url::parse(url).map(|u| u.path() == "/").unwrap_or(false)
}
