use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::core::cloudflare::{
    ApiBody, ApiEnvelope, ApiMethod, ApiRequest, CloudflareApi, CloudflareError,
};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Only the URL scanner gives 409 and 202 their cooldown and pending meaning.
fn is_url_scanner(path: &str) -> bool {
    path.contains("/urlscanner/")
}

/// Token or legacy key credentials. Both are sent when both are set.
#[derive(Debug, Clone, Default)]
pub struct CloudflareAuth {
    pub api_token: Option<String>,
    pub email: Option<String>,
    pub api_key: Option<String>,
}

impl CloudflareAuth {
    fn has_legacy_key(&self) -> bool {
        self.email.is_some() && self.api_key.is_some()
    }
}

/// Cloudflare v4 REST client. Unwraps the response envelope for the core layer.
pub struct CloudflareHttpClient {
    client: Client,
    base_url: String,
    auth: CloudflareAuth,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    result_info: Option<Value>,
}

impl RawEnvelope {
    fn first_error(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.trim())
            .find(|m| !m.is_empty())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

impl CloudflareHttpClient {
    pub fn new(auth: CloudflareAuth) -> Result<Self, CloudflareError> {
        Self::with_base_url(auth, CLOUDFLARE_API_BASE)
    }

    pub fn with_base_url(
        auth: CloudflareAuth,
        base_url: impl Into<String>,
    ) -> Result<Self, CloudflareError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static(concat!("BeeHiveGuardBot/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CloudflareError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn build(&self, request: ApiRequest) -> Result<RequestBuilder, CloudflareError> {
        if self.auth.api_token.is_none() && !self.auth.has_legacy_key() {
            return Err(CloudflareError::MissingCredential("CLOUDFLARE_API_TOKEN"));
        }

        let method = match request.method {
            ApiMethod::Get => Method::GET,
            ApiMethod::Post => Method::POST,
            ApiMethod::Put => Method::PUT,
            ApiMethod::Patch => Method::PATCH,
            ApiMethod::Delete => Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.auth.api_token {
            builder = builder.bearer_auth(token);
        }
        if let (Some(email), Some(key)) = (&self.auth.email, &self.auth.api_key) {
            builder = builder.header("X-Auth-Email", email).header("X-Auth-Key", key);
        }

        builder = match request.body {
            ApiBody::Empty => builder,
            ApiBody::Json(body) => builder.json(&body),
            ApiBody::File {
                field,
                filename,
                bytes,
                content_type,
            } => {
                let mut part = Part::bytes(bytes).file_name(filename);
                if let Some(content_type) = content_type {
                    part = part
                        .mime_str(&content_type)
                        .map_err(|e| CloudflareError::InvalidInput(e.to_string()))?;
                }
                builder.multipart(Form::new().part(field, part))
            }
            ApiBody::Bytes {
                bytes,
                content_type,
            } => builder.header(CONTENT_TYPE, content_type).body(bytes),
        };

        Ok(builder)
    }

    async fn execute(&self, request: ApiRequest) -> Result<Response, CloudflareError> {
        let path = request.path.clone();
        let resp = self
            .build(request)?
            .send()
            .await
            .map_err(|e| CloudflareError::Http(e.to_string()))?;

        match resp.status() {
            StatusCode::CONFLICT if is_url_scanner(&path) => Err(CloudflareError::Cooldown),
            StatusCode::ACCEPTED if is_url_scanner(&path) => Err(CloudflareError::NotReady),
            status => {
                tracing::debug!(path = %path, status = %status, "Cloudflare API response");
                Ok(resp)
            }
        }
    }
}

#[async_trait]
impl CloudflareApi for CloudflareHttpClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiEnvelope, CloudflareError> {
        let resp = self.execute(request).await?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CloudflareError::Http(e.to_string()))?;

        let envelope: RawEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(CloudflareError::Http(format!(
                    "Cloudflare returned {status}"
                )))
            }
            Err(e) => return Err(CloudflareError::Decode(e.to_string())),
        };

        if !envelope.success || !status.is_success() {
            return Err(CloudflareError::Api(envelope.first_error()));
        }

        Ok(ApiEnvelope {
            result: envelope.result,
            result_info: envelope.result_info,
        })
    }

    async fn fetch_bytes(&self, request: ApiRequest) -> Result<Vec<u8>, CloudflareError> {
        let limit = request.max_bytes;
        let mut resp = self.execute(request).await?;
        let status = resp.status();

        if !status.is_success() {
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| CloudflareError::Http(e.to_string()))?;
            return Err(match serde_json::from_slice::<RawEnvelope>(&bytes) {
                Ok(envelope) => CloudflareError::Api(envelope.first_error()),
                Err(_) => CloudflareError::Http(format!("Cloudflare returned {status}")),
            });
        }

        let too_large = |limit: u64| {
            CloudflareError::TooLarge(format!("The response is larger than {limit} bytes."))
        };
        if let (Some(limit), Some(length)) = (limit, resp.content_length()) {
            if length > limit {
                return Err(too_large(limit));
            }
        }

        // Content-Length can be missing or wrong, so count while reading too.
        let mut bytes = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| CloudflareError::Http(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            if let Some(limit) = limit {
                if bytes.len() as u64 > limit {
                    return Err(too_large(limit));
                }
            }
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_auth() -> CloudflareAuth {
        CloudflareAuth {
            api_token: Some("tok".to_string()),
            ..Default::default()
        }
    }

    async fn client(server: &MockServer) -> CloudflareHttpClient {
        CloudflareHttpClient::with_base_url(token_auth(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn unwraps_successful_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/intel/domain"))
            .and(query_param("domain", "example.com"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "domain": "example.com", "risk_score": 0 },
                "result_info": { "page": 1 }
            })))
            .mount(&server)
            .await;

        let envelope = client(&server)
            .await
            .send(ApiRequest::get("/accounts/acc/intel/domain").query("domain", "example.com"))
            .await
            .unwrap();
        assert_eq!(envelope.result["domain"], "example.com");
        assert!(envelope.result_info.is_some());
    }

    #[tokio::test]
    async fn failed_envelope_surfaces_first_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 10000, "message": "Authentication error" }],
                "result": null
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .send(ApiRequest::get("/zones"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudflareError::Api(msg) if msg == "Authentication error"));
    }

    #[tokio::test]
    async fn empty_error_list_is_unknown_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "errors": [], "result": null
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .send(ApiRequest::get("/zones"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudflareError::Api(msg) if msg == "Unknown error"));
    }

    #[tokio::test]
    async fn conflict_and_accepted_have_their_own_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/acc/urlscanner/scan"))
            .and(body_json(json!({ "url": "https://a.example" })))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/urlscanner/scan/abc"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let submit = client
            .send(
                ApiRequest::post("/accounts/acc/urlscanner/scan")
                    .json(json!({ "url": "https://a.example" })),
            )
            .await;
        assert!(matches!(submit, Err(CloudflareError::Cooldown)));

        let poll = client
            .send(ApiRequest::get("/accounts/acc/urlscanner/scan/abc"))
            .await;
        assert!(matches!(poll, Err(CloudflareError::NotReady)));
    }

    #[tokio::test]
    async fn conflicts_elsewhere_keep_the_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/acc/r2/buckets"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 10004, "message": "The bucket you tried to create already exists, and you own it." }],
                "result": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/zones/z/purge_cache"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "success": true, "errors": [], "result": { "id": "p1" }
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client
            .send(ApiRequest::post("/accounts/acc/r2/buckets").json(json!({ "name": "logs" })))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CloudflareError::Api(msg) if msg.starts_with("The bucket you tried to create already exists")
        ));

        let accepted = client
            .send(ApiRequest::post("/zones/z/purge_cache"))
            .await
            .unwrap();
        assert_eq!(accepted.result["id"], "p1");
    }

    #[tokio::test]
    async fn legacy_key_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(header("X-Auth-Email", "me@example.com"))
            .and(header("X-Auth-Key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "errors": [], "result": { "id": "x" }
            })))
            .mount(&server)
            .await;

        let auth = CloudflareAuth {
            api_token: None,
            email: Some("me@example.com".to_string()),
            api_key: Some("key".to_string()),
        };
        let client = CloudflareHttpClient::with_base_url(auth, server.uri()).unwrap();
        assert!(client.send(ApiRequest::delete("/zones/z/dnssec")).await.is_ok());
    }

    #[tokio::test]
    async fn no_credentials_means_no_request() {
        let client =
            CloudflareHttpClient::with_base_url(CloudflareAuth::default(), "http://127.0.0.1:9")
                .unwrap();
        assert!(matches!(
            client.send(ApiRequest::get("/zones")).await,
            Err(CloudflareError::MissingCredential(_))
        ));
    }

    #[tokio::test]
    async fn file_uploads_are_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/acc/images/v1"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "errors": [], "result": { "id": "img", "filename": "cat.png" }
            })))
            .mount(&server)
            .await;

        let envelope = client(&server)
            .await
            .send(ApiRequest::post("/accounts/acc/images/v1").body(ApiBody::File {
                field: "file".to_string(),
                filename: "cat.png".to_string(),
                bytes: vec![137, 80, 78, 71],
                content_type: Some("image/png".to_string()),
            }))
            .await
            .unwrap();
        assert_eq!(envelope.result["id"], "img");
    }

    #[tokio::test]
    async fn raw_bodies_are_returned_as_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/urlscanner/scan/abc/screenshot"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let bytes = client(&server)
            .await
            .fetch_bytes(ApiRequest::get("/accounts/acc/urlscanner/scan/abc/screenshot"))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn bodies_over_the_limit_are_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/r2/buckets/b/objects/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let request = ApiRequest::get("/accounts/acc/r2/buckets/b/objects/big.bin");
        assert!(matches!(
            client.fetch_bytes(request.clone().max_bytes(1024)).await,
            Err(CloudflareError::TooLarge(_))
        ));
        assert_eq!(
            client.fetch_bytes(request.max_bytes(4096)).await.unwrap().len(),
            4096
        );
    }
}
