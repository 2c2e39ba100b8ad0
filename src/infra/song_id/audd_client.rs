use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::core::song_id::{SongError, SongMatch, SongRecognizer};

pub const AUDD_API_URL: &str = "https://api.audd.io/";

/// AudD music recognition client.
pub struct AuddClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuddResponse {
    status: String,
    #[serde(default)]
    result: Option<AuddTrack>,
    #[serde(default)]
    error: Option<AuddError>,
}

#[derive(Debug, Deserialize)]
struct AuddError {
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct AuddTrack {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    album: Option<String>,
    release_date: Option<String>,
    song_link: Option<String>,
}

impl AuddClient {
    pub fn new(api_token: Option<String>) -> Result<Self, SongError> {
        Self::with_endpoint(api_token, AUDD_API_URL)
    }

    pub fn with_endpoint(
        api_token: Option<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, SongError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SongError::Api(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
        })
    }
}

#[async_trait]
impl SongRecognizer for AuddClient {
    async fn recognize(&self, audio_url: &str) -> Result<Option<SongMatch>, SongError> {
        let mut form = vec![("url", audio_url), ("return", "apple_music,spotify")];
        if let Some(token) = &self.api_token {
            form.push(("api_token", token.as_str()));
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| SongError::Api(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SongError::Api(format!("AudD returned {}", resp.status())));
        }

        let body: AuddResponse = resp
            .json()
            .await
            .map_err(|e| SongError::Api(e.to_string()))?;

        if body.status != "success" {
            let message = body
                .error
                .map(|e| e.error_message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("status {}", body.status));
            return Err(SongError::Api(message));
        }

        Ok(body.result.map(|track| SongMatch {
            title: track.title,
            artist: track.artist,
            album: track.album,
            release_date: track.release_date,
            song_link: track.song_link,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_matched_track() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("api_token=secret"))
            .and(body_string_contains("return=apple_music%2Cspotify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "result": {
                    "artist": "Imagine Dragons",
                    "title": "Warriors",
                    "album": "Warriors",
                    "release_date": "2014-09-18",
                    "song_link": "https://lis.tn/Warriors"
                }
            })))
            .mount(&server)
            .await;

        let client = AuddClient::with_endpoint(Some("secret".to_string()), server.uri()).unwrap();
        let found = client
            .recognize("https://cdn.example/clip.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Warriors");
        assert_eq!(found.artist, "Imagine Dragons");
        assert_eq!(found.song_link.as_deref(), Some("https://lis.tn/Warriors"));
    }

    #[tokio::test]
    async fn null_result_means_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "success", "result": null })),
            )
            .mount(&server)
            .await;

        let client = AuddClient::with_endpoint(None, server.uri()).unwrap();
        assert_eq!(client.recognize("https://a/b.mp3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "error": { "error_code": 900, "error_message": "Recognition failed" }
            })))
            .mount(&server)
            .await;

        let client = AuddClient::with_endpoint(None, server.uri()).unwrap();
        assert!(matches!(
            client.recognize("https://a/b.mp3").await,
            Err(SongError::Api(msg)) if msg == "Recognition failed"
        ));
    }
}
