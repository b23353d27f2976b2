use crate::error::Result;
use reqwest::Client;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("sitelens/", env!("CARGO_PKG_VERSION"));

/// Shared client settings for every network-facing component.
///
/// Per-request timeouts (robots, pages, PageSpeed) are applied on top of
/// the client-wide `timeout`.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_redirects: 10,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

pub fn build_client(options: &HttpOptions) -> Result<Client> {
    let client = Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .connect_timeout(options.timeout / 4)
        .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_client() {
        assert!(build_client(&HttpOptions::default()).is_ok());
    }
}
