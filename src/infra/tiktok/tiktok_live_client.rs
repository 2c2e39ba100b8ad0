use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::core::tiktok::{LiveStatusClient, TikTokError};

pub const TIKTOK_BASE_URL: &str = "https://www.tiktok.com";

/// Room status TikTok reports while a stream is running.
const ROOM_STATUS_LIVE: i64 = 2;

/// Polls TikTok's public room-info endpoint for a creator's live status.
pub struct TikTokLiveClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RoomResponse {
    #[serde(default)]
    data: Option<RoomData>,
}

#[derive(Debug, Deserialize)]
struct RoomData {
    #[serde(rename = "liveRoom", default)]
    live_room: Option<LiveRoom>,
}

#[derive(Debug, Deserialize)]
struct LiveRoom {
    #[serde(default)]
    status: i64,
}

impl TikTokLiveClient {
    pub fn new() -> Result<Self, TikTokError> {
        Self::with_base_url(TIKTOK_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TikTokError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
            ),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| TikTokError::LiveCheck(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LiveStatusClient for TikTokLiveClient {
    async fn is_live(&self, creator: &str) -> Result<bool, TikTokError> {
        let url = format!("{}/api-live/user/room/", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("aid", "1988"), ("uniqueId", creator), ("sourceType", "54")])
            .send()
            .await
            .map_err(|e| TikTokError::LiveCheck(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TikTokError::LiveCheck(format!(
                "room lookup for {} returned {}",
                creator,
                resp.status()
            )));
        }

        let body: RoomResponse = resp
            .json()
            .await
            .map_err(|e| TikTokError::LiveCheck(e.to_string()))?;

        Ok(body
            .data
            .and_then(|d| d.live_room)
            .is_some_and(|room| room.status == ROOM_STATUS_LIVE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_room(server: &MockServer, creator: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api-live/user/room/"))
            .and(query_param("uniqueId", creator))
            .and(query_param("aid", "1988"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn status_two_is_live() {
        let server = MockServer::start().await;
        mount_room(&server, "bee", json!({ "data": { "liveRoom": { "status": 2 } } })).await;
        mount_room(&server, "wasp", json!({ "data": { "liveRoom": { "status": 4 } } })).await;

        let client = TikTokLiveClient::with_base_url(server.uri()).unwrap();
        assert!(client.is_live("bee").await.unwrap());
        assert!(!client.is_live("wasp").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_user_is_offline() {
        let server = MockServer::start().await;
        mount_room(&server, "ghost", json!({ "statusCode": 19881007, "data": {} })).await;

        let client = TikTokLiveClient::with_base_url(server.uri()).unwrap();
        assert!(!client.is_live("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn http_failure_is_a_live_check_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = TikTokLiveClient::with_base_url(server.uri()).unwrap();
        assert!(matches!(
            client.is_live("bee").await,
            Err(TikTokError::LiveCheck(_))
        ));
    }
}
