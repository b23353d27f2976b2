// robots.txt gate. Fails open: any problem loading or parsing the file
// leaves every URL fetchable.

use reqwest::Client;
use std::time::Duration;
use texting_robots::Robot;
use tracing::{debug, info, warn};
use url::Url;

/// User agent the rules are evaluated for
pub const ROBOTS_AGENT: &str = "*";

const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RobotsGate {
    robot: Option<Robot>,
}

impl RobotsGate {
    /// A gate with no rules loaded.
    pub fn allow_all() -> Self {
        Self { robot: None }
    }

    /// Build a gate from robots.txt contents. Unparseable contents allow everything.
    pub fn from_text(contents: &str) -> Self {
        match Robot::new(ROBOTS_AGENT, contents.as_bytes()) {
            Ok(robot) => Self { robot: Some(robot) },
            Err(e) => {
                warn!("Could not parse robots.txt, allowing all URLs: {}", e);
                Self::allow_all()
            }
        }
    }

    /// Fetch `{origin}/robots.txt` for `base_url` and load its rules.
    ///
    /// Returns true only when rules were loaded. Any other outcome leaves
    /// the gate in allow-all mode and the crawl continues.
    pub async fn load(&mut self, client: &Client, base_url: &Url) -> bool {
        let robots_url = match base_url.join("/robots.txt") {
            Ok(u) => u,
            Err(e) => {
                warn!("Cannot build robots.txt URL from {}: {}", base_url, e);
                *self = Self::allow_all();
                return false;
            }
        };

        debug!("Fetching {}", robots_url);
        let response = match client
            .get(robots_url.clone())
            .timeout(ROBOTS_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Could not load robots.txt: {}", e);
                *self = Self::allow_all();
                return false;
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            info!("robots.txt not found (status {})", status);
            *self = Self::allow_all();
            return false;
        }

        match response.text().await {
            Ok(body) => {
                *self = Self::from_text(&body);
                let loaded = self.is_loaded();
                if loaded {
                    info!("Loaded robots.txt from {}", robots_url);
                }
                loaded
            }
            Err(e) => {
                warn!("Could not read robots.txt body: {}", e);
                *self = Self::allow_all();
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.robot.is_some()
    }

    pub fn can_fetch(&self, url: &str) -> bool {
        match self.robot {
            Some(ref robot) => robot.allowed(url),
            None => true,
        }
    }

    /// Sitemap URLs declared in the loaded robots.txt
    pub fn sitemaps(&self) -> Vec<String> {
        self.robot
            .as_ref()
            .map(|r| r.sitemaps.clone())
            .unwrap_or_default()
    }
}

impl Default for RobotsGate {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_allow_all_permits_everything() {
        let gate = RobotsGate::allow_all();
        assert!(!gate.is_loaded());
        assert!(gate.can_fetch("https://shop.test/admin"));
    }

    #[test]
    fn test_disallow_rule() {
        let gate = RobotsGate::from_text("User-agent: *\nDisallow: /admin\n");
        assert!(gate.is_loaded());
        assert!(!gate.can_fetch("https://shop.test/admin/panel"));
        assert!(gate.can_fetch("https://shop.test/products/a"));
    }

    #[test]
    fn test_sitemaps_are_exposed() {
        let gate = RobotsGate::from_text(
            "User-agent: *\nDisallow: /cart\nSitemap: https://shop.test/sitemap.xml\n",
        );
        assert_eq!(gate.sitemaps(), vec!["https://shop.test/sitemap.xml".to_string()]);
    }

    #[tokio::test]
    async fn test_load_missing_robots_fails_open() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let base = Url::parse(&mock_server.uri()).unwrap();
        let mut gate = RobotsGate::allow_all();
        let loaded = gate.load(&Client::new(), &base).await;

        assert!(!loaded);
        assert!(gate.can_fetch(&format!("{}/admin", mock_server.uri())));
    }

    #[tokio::test]
    async fn test_load_rules_from_server() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("User-agent: *\nDisallow: /admin\n"),
            )
            .mount(&mock_server)
            .await;

        let base = Url::parse(&format!("{}/collections/all", mock_server.uri())).unwrap();
        let mut gate = RobotsGate::allow_all();
        let loaded = gate.load(&Client::new(), &base).await;

        assert!(loaded);
        assert!(!gate.can_fetch(&format!("{}/admin/panel", mock_server.uri())));
        assert!(gate.can_fetch(&format!("{}/", mock_server.uri())));
    }

    #[tokio::test]
    async fn test_load_unreachable_host_fails_open() {
        // Nothing listens on port 9 locally
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        let mut gate = RobotsGate::allow_all();
        assert!(!gate.load(&Client::new(), &base).await);
        assert!(gate.can_fetch("http://127.0.0.1:9/anything"));
    }
}
