use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitelens_core::artifacts::Artifact;
use sitelens_core::audit::{Audit, AuditConfig};
use sitelens_core::{report, vitals};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Settings shared by every subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalOptions {
    pub output_dir: PathBuf,
    pub quiet: bool,
    pub max_urls: Option<usize>,
    pub target: Option<usize>,
    pub api_key: Option<String>,
}

impl GlobalOptions {
    /// Read the options a subcommand defines. Ones it doesn't define stay unset.
    pub fn from_matches(args: &ArgMatches) -> Self {
        let output_dir = args
            .try_get_one::<String>("output-dir")
            .ok()
            .flatten()
            .map(String::as_str)
            .map(expand_output_dir)
            .unwrap_or_else(|| PathBuf::from("./sitelens-audit"));

        Self {
            output_dir,
            quiet: args.try_get_one::<bool>("quiet").ok().flatten().copied().unwrap_or(false),
            max_urls: args.try_get_one::<usize>("max-urls").ok().flatten().copied(),
            target: args.try_get_one::<usize>("target").ok().flatten().copied(),
            api_key: args.try_get_one::<String>("api-key").ok().flatten().cloned(),
        }
    }

    pub fn to_config(&self) -> AuditConfig {
        let mut config = AuditConfig::new(self.output_dir.clone());
        if let Some(max_urls) = self.max_urls {
            config.crawl.max_urls = max_urls;
        }
        if let Some(target) = self.target {
            config.target = target;
        }
        config.api_key = AuditConfig::resolve_api_key(self.api_key.clone());
        config
    }
}

/// Expand a leading `~` in the output directory
pub fn expand_output_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Parse a seed URL, assuming https:// when no web scheme is given
pub fn parse_base_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(raw)
        && matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
    {
        return Some(url.to_string());
    }

    let with_scheme = format!("https://{}", raw);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

pub fn print_banner() {
    println!(
        "{} {}",
        "sitelens".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}", "storefront SEO, security and performance audit".bright_black());
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_heading(title: &str) {
    print_divider();
    println!("  {}", title.bright_white().bold());
    print_divider();
    println!();
}

fn print_saved(path: &Path) {
    println!(
        "{} Saved {}",
        "→".blue(),
        path.display().to_string().bright_white()
    );
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Build the audit with spinner-driven progress callbacks attached
fn open_audit(options: &GlobalOptions, spinner: &ProgressBar) -> anyhow::Result<Audit> {
    let config = options.to_config();
    debug!(
        "Output directory {}, max {} URLs, target {}, API key {}",
        config.output_dir.display(),
        config.crawl.max_urls,
        config.target,
        if config.api_key.is_some() { "set" } else { "not set" }
    );

    let crawl_bar = spinner.clone();
    let page_bar = spinner.clone();
    let audit = Audit::new(config)
        .context("Failed to set up the HTTP client")?
        .with_crawl_progress(Arc::new(move |visited: usize, url: String| {
            crawl_bar.set_message(format!("[{} visited] {}", visited, url));
        }))
        .with_page_progress(Arc::new(move |idx: usize, total: usize, url: String| {
            page_bar.set_message(format!("[{}/{}] {}", idx, total, url));
        }));

    Ok(audit)
}

fn seed_url(args: &ArgMatches) -> anyhow::Result<String> {
    let raw = args
        .try_get_one::<String>("URL")
        .ok()
        .flatten()
        .context("A storefront URL is required")?;
    match parse_base_url(raw) {
        Some(url) => Ok(url),
        None => bail!("'{}' is not a valid http(s) URL", raw),
    }
}

pub async fn handle_crawl(args: &ArgMatches) -> anyhow::Result<()> {
    let options = GlobalOptions::from_matches(args);
    let base_url = seed_url(args)?;

    let spinner = spinner(options.quiet);
    spinner.set_message(format!("Crawling {}", base_url));
    let audit = open_audit(&options, &spinner)?;

    let result = audit.crawl(&base_url).await;
    spinner.finish_and_clear();
    let result = result?;

    println!("{} Crawl complete\n", "✓".green().bold());
    print_heading("CRAWL");
    print!("{}", report::crawl_summary(&result));
    println!();
    print_saved(&audit.store().path(Artifact::CrawlResults));
    Ok(())
}

pub fn handle_select(args: &ArgMatches) -> anyhow::Result<()> {
    let options = GlobalOptions::from_matches(args);
    let audit = open_audit(&options, &ProgressBar::hidden())?;

    let selected = audit.select()?;

    print_heading("URL SELECTION");
    print!("{}", report::selection_summary(&selected));
    println!();
    print_saved(&audit.store().path(Artifact::UrlSet));
    Ok(())
}

pub async fn handle_performance(args: &ArgMatches) -> anyhow::Result<()> {
    let options = GlobalOptions::from_matches(args);

    let spinner = spinner(options.quiet);
    spinner.set_message("Querying PageSpeed Insights");
    let audit = open_audit(&options, &spinner)?;

    let pages = audit.performance().await;
    spinner.finish_and_clear();
    let pages = pages?;

    println!("{} Performance measured\n", "✓".green().bold());
    print_heading("PAGESPEED");
    print!("{}", report::performance_summary(&pages));
    println!();
    print_heading("CORE WEB VITALS");
    print!("{}", report::vitals_summary(&vitals::summarize(&pages)));
    println!();
    print_saved(&audit.store().path(Artifact::PerformanceSummary));
    print_saved(&audit.store().path(Artifact::CoreWebVitals));
    Ok(())
}

pub async fn handle_onpage(args: &ArgMatches) -> anyhow::Result<()> {
    let options = GlobalOptions::from_matches(args);

    let spinner = spinner(options.quiet);
    spinner.set_message("Analyzing pages");
    let audit = open_audit(&options, &spinner)?;

    let pages = audit.onpage().await;
    spinner.finish_and_clear();
    let pages = pages?;

    println!("{} On-page analysis complete\n", "✓".green().bold());
    print_heading("ON-PAGE");
    print!("{}", report::onpage_summary(&pages));
    println!();
    print_saved(&audit.store().path(Artifact::OnPageAnalysis));
    Ok(())
}

pub fn handle_findings(args: &ArgMatches) -> anyhow::Result<()> {
    let options = GlobalOptions::from_matches(args);
    let audit = open_audit(&options, &ProgressBar::hidden())?;

    let findings = audit.findings()?;

    print!("{}", report::findings_report(&findings));
    print_saved(&audit.store().path(Artifact::Findings));
    Ok(())
}

pub async fn handle_audit(args: &ArgMatches) -> anyhow::Result<()> {
    let options = GlobalOptions::from_matches(args);
    let base_url = seed_url(args)?;

    let spinner = spinner(options.quiet);
    spinner.set_message(format!("Auditing {}", base_url));
    let audit = open_audit(&options, &spinner)?;

    if audit.config().api_key.is_none() {
        spinner.println(format!(
            "{} No PageSpeed Insights API key; the performance stage will be skipped",
            "⚠".yellow().bold()
        ));
    }

    let summary = audit.run_all(&base_url).await;
    spinner.finish_and_clear();
    let summary = summary?;

    println!("{} Audit complete\n", "✓".green().bold());

    print_heading("CRAWL");
    print!("{}", report::crawl_summary(&summary.crawl));
    println!();

    print_heading("URL SELECTION");
    print!("{}", report::selection_summary(&summary.selected));
    println!();

    if let Some(ref performance) = summary.performance {
        print_heading("PAGESPEED");
        print!("{}", report::performance_summary(performance));
        println!();
        print_heading("CORE WEB VITALS");
        print!("{}", report::vitals_summary(&vitals::summarize(performance)));
        println!();
    }

    print_heading("ON-PAGE");
    print!("{}", report::onpage_summary(&summary.onpage));
    println!();

    print!("{}", report::findings_report(&summary.findings));
    println!(
        "{} Artifacts written to {}",
        "→".blue(),
        audit.store().dir().display().to_string().bright_white()
    );
    Ok(())
}
