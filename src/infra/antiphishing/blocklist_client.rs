// HTTP block-list sources.
//
// Both known feeds publish a plain JSON array of domain strings. The client
// sends an identifying `X-Identity` header because the feeds ask for one.

use crate::core::antiphishing::{BlocklistSource, PhishingError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;

pub const SINKING_YACHTS_URL: &str = "https://phish.sinking.yachts/v2/all";
pub const BEEHIVE_BLOCKLIST_URL: &str = "https://www.beehive.systems/hubfs/blocklist/blocklist.json";

const IDENTITY: &str = concat!(
    "BeeHive AntiPhishing v",
    env!("CARGO_PKG_VERSION"),
    " (https://www.beehive.systems/sentri)"
);

/// One remote JSON block-list.
pub struct HttpBlocklistSource {
    client: Client,
    url: String,
}

impl HttpBlocklistSource {
    pub fn new(url: impl Into<String>) -> Result<Self, PhishingError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Identity", HeaderValue::from_static(IDENTITY));
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(concat!("BeeHiveGuardBot/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PhishingError::SourceError(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The two feeds the bot ships with.
    pub fn defaults() -> Result<Vec<Box<dyn BlocklistSource>>, PhishingError> {
        Ok(vec![
            Box::new(Self::new(SINKING_YACHTS_URL)?),
            Box::new(Self::new(BEEHIVE_BLOCKLIST_URL)?),
        ])
    }
}

#[async_trait]
impl BlocklistSource for HttpBlocklistSource {
    async fn fetch_domains(&self) -> Result<Vec<String>, PhishingError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PhishingError::SourceError(format!("{}: {}", self.url, e)))?;

        if !resp.status().is_success() {
            return Err(PhishingError::SourceError(format!(
                "{} returned {}",
                self.url,
                resp.status()
            )));
        }

        let domains: Vec<String> = resp
            .json()
            .await
            .map_err(|e| PhishingError::SourceError(format!("{}: {}", self.url, e)))?;

        tracing::debug!(url = %self.url, domains = domains.len(), "Fetched block-list");
        Ok(domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_array_with_identity_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/all"))
            .and(header_exists("X-Identity"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!(["evil.com", "phish.net"])),
            )
            .mount(&server)
            .await;

        let source = HttpBlocklistSource::new(format!("{}/v2/all", server.uri())).unwrap();
        let domains = source.fetch_domains().await.unwrap();
        assert_eq!(domains, vec!["evil.com", "phish.net"]);
    }

    #[tokio::test]
    async fn server_errors_are_source_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpBlocklistSource::new(server.uri()).unwrap();
        assert!(matches!(
            source.fetch_domains().await,
            Err(PhishingError::SourceError(_))
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let source = HttpBlocklistSource::new(server.uri()).unwrap();
        assert!(source.fetch_domains().await.is_err());
    }
}
