use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitelens")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitelens")
        .about("Crawl an e-commerce storefront and audit its SEO, security and performance")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress the banner and progress spinner")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log debug output to stderr")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-o --"output-dir" <PATH>)
                .required(false)
                .help("Directory holding the audit artifacts")
                .default_value("./sitelens-audit")
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("crawl")
                .about("Discover and categorize the site's URLs, writing crawl_results.json")
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("The storefront URL to start crawling from"),
                )
                .arg(max_urls_arg()),
        )
        .subcommand(
            command!("select")
                .about("Pick a representative URL sample from crawl_results.json")
                .arg(target_arg()),
        )
        .subcommand(
            command!("performance")
                .about("Measure the selected URLs with PageSpeed Insights (mobile and desktop)")
                .arg(api_key_arg()),
        )
        .subcommand(
            command!("onpage")
                .about("Fetch the selected URLs and analyze SEO and security signals"),
        )
        .subcommand(
            command!("findings")
                .about("Turn the performance and on-page artifacts into prioritized findings"),
        )
        .subcommand(
            command!("audit")
                .about(
                    "Run every stage in order. Performance is skipped when no API key is \
                configured.",
                )
                .arg(
                    arg!(<URL>)
                        .required(true)
                        .help("The storefront URL to audit"),
                )
                .arg(max_urls_arg())
                .arg(target_arg())
                .arg(api_key_arg()),
        )
}

fn max_urls_arg() -> clap::Arg {
    arg!(--"max-urls" <NUM>)
        .required(false)
        .help("Stop discovering URLs once this many are known")
        .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..))
        .default_value("120")
}

fn target_arg() -> clap::Arg {
    arg!(-t --"target" <NUM>)
        .required(false)
        .help("Number of URLs to select for analysis")
        .value_parser(clap::value_parser!(usize))
        .default_value("15")
}

fn api_key_arg() -> clap::Arg {
    arg!(--"api-key" <KEY>)
        .required(false)
        .help("PageSpeed Insights API key (default: $PAGESPEED_INSIGHTS_API_KEY)")
}
