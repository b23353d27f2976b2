pub mod crawler;
pub mod error;
pub mod http;
pub mod onpage;
pub mod pagespeed;
pub mod result;
pub mod robots;
pub mod urls;

pub use crawler::{CrawlOptions, Crawler};
pub use error::ScanError;
pub use onpage::OnPageAnalyzer;
pub use pagespeed::PageSpeedClient;
pub use result::{CrawlResult, PageAnalysis, PagePerformance};
pub use robots::RobotsGate;
pub use urls::UrlCategory;
