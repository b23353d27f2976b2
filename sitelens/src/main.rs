use colored::Colorize;
use commands::command_argument_builder;
use sitelens::handlers::{
    handle_audit, handle_crawl, handle_findings, handle_onpage, handle_performance,
    handle_select, print_banner,
};
use tracing::Level;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if !quiet {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command).await,
        Some(("select", primary_command)) => handle_select(primary_command),
        Some(("performance", primary_command)) => handle_performance(primary_command).await,
        Some(("onpage", primary_command)) => handle_onpage(primary_command).await,
        Some(("findings", primary_command)) => handle_findings(primary_command),
        Some(("audit", primary_command)) => handle_audit(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_global_flags_reach_subcommands() {
        let matches = command_argument_builder()
            .try_get_matches_from(["sitelens", "select", "-o", "/tmp/audit", "--target", "3"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "select");
        assert_eq!(sub.get_one::<String>("output-dir").unwrap(), "/tmp/audit");
        assert_eq!(*sub.get_one::<usize>("target").unwrap(), 3);
    }

    #[test]
    fn test_crawl_requires_url() {
        assert!(
            command_argument_builder()
                .try_get_matches_from(["sitelens", "crawl"])
                .is_err()
        );
    }

    #[test]
    fn test_crawl_rejects_zero_url_budget() {
        let builder = command_argument_builder();
        assert!(
            builder
                .clone()
                .try_get_matches_from(["sitelens", "crawl", "shop.test", "--max-urls", "0"])
                .is_err()
        );

        let matches = builder
            .try_get_matches_from(["sitelens", "crawl", "shop.test", "--max-urls", "1"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(*sub.get_one::<usize>("max-urls").unwrap(), 1);
    }
}
