// Cloudflare service - typed operations over the v4 REST API.
//
// The HTTP transport lives behind `CloudflareApi`; this file owns the paths,
// request bodies, input validation and result decoding. Account and zone ids
// are configuration, so a missing one is reported per command instead of
// failing startup.

use super::cloudflare_models::*;
use super::validation::{
    validate_domain, validate_image_filename, validate_location_hint, validate_public_ip,
    scannable_urls, MAX_FETCH_BYTES, MAX_STASH_BYTES,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CloudflareError {
    #[error("Missing Cloudflare configuration: {0}")]
    MissingCredential(&'static str),

    #[error("{0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected response from Cloudflare: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("The domain was too recently scanned. Please try again in a few minutes.")]
    Cooldown,

    #[error("The scan has not finished yet.")]
    NotReady,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooLarge(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// PORTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Empty,
    Json(Value),
    /// Single-file multipart upload.
    File {
        field: String,
        filename: String,
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    Bytes {
        bytes: Vec<u8>,
        content_type: String,
    },
}

/// A request relative to the API root (`/accounts/...`, `/zones/...`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: ApiBody,
    /// Upper bound on a raw body read by `fetch_bytes`.
    pub max_bytes: Option<u64>,
}

impl ApiRequest {
    fn new(method: ApiMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: ApiBody::Empty,
            max_bytes: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = ApiBody::Json(body);
        self
    }

    pub fn body(mut self, body: ApiBody) -> Self {
        self.body = body;
        self
    }

    pub fn max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }
}

/// Percent-encode one path segment so a name can't add segments, a query or
/// a fragment.
fn path_segment(raw: &str) -> String {
    if matches!(raw, "." | "..") {
        return raw.replace('.', "%2E");
    }
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return raw.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(raw);
    }
    url.path().trim_start_matches('/').to_string()
}

/// The `result` and `result_info` of a successful envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiEnvelope {
    pub result: Value,
    pub result_info: Option<Value>,
}

/// Transport for the Cloudflare API.
///
/// Implementations unwrap the `{ success, errors, result }` envelope and turn
/// a failed one into `CloudflareError::Api`. On URL scanner paths HTTP 409 is
/// `Cooldown` and 202 is `NotReady`.
#[async_trait]
pub trait CloudflareApi: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiEnvelope, CloudflareError>;

    /// For endpoints that answer with a raw body (screenshots, R2 objects).
    /// A body past `request.max_bytes` is refused with `TooLarge` before it
    /// is fully read.
    async fn fetch_bytes(&self, request: ApiRequest) -> Result<Vec<u8>, CloudflareError>;
}

/// Guild opt-in for automatic URL scanning.
#[async_trait]
pub trait AutoscanStore: Send + Sync {
    async fn is_enabled(&self, guild_id: u64) -> Result<bool, CloudflareError>;
    async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), CloudflareError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Ids that select which account and zone the commands act on.
#[derive(Debug, Clone, Default)]
pub struct CloudflareScope {
    pub account_id: Option<String>,
    pub zone_id: Option<String>,
}

/// Input for `hyperdrive create`.
#[derive(Debug, Clone)]
pub struct NewHyperdrive {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub scheme: String,
    pub user: String,
    pub password: String,
    pub caching_disabled: bool,
    pub max_age: Option<u64>,
    pub stale_while_revalidate: Option<u64>,
}

pub struct CloudflareService<A: CloudflareApi, S: AutoscanStore> {
    api: A,
    autoscan: S,
    scope: CloudflareScope,
    scan_poll_interval: Duration,
    scan_max_polls: u32,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, CloudflareError> {
    serde_json::from_value(value).map_err(|e| CloudflareError::Decode(e.to_string()))
}

/// Decode `result[key]`, treating a missing key as empty.
fn decode_field<T: DeserializeOwned + Default>(value: Value, key: &str) -> Result<T, CloudflareError> {
    match value.get(key) {
        Some(inner) if !inner.is_null() => decode(inner.clone()),
        _ => Ok(T::default()),
    }
}

impl<A: CloudflareApi, S: AutoscanStore> CloudflareService<A, S> {
    pub fn new(api: A, autoscan: S, scope: CloudflareScope) -> Self {
        Self {
            api,
            autoscan,
            scope,
            scan_poll_interval: Duration::from_secs(15),
            scan_max_polls: 40,
        }
    }

    /// Override how often `wait_for_scan` polls and how many times.
    #[cfg(test)]
    pub fn with_scan_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.scan_poll_interval = interval;
        self.scan_max_polls = max_polls.max(1);
        self
    }

    fn account(&self) -> Result<&str, CloudflareError> {
        self.scope
            .account_id
            .as_deref()
            .ok_or(CloudflareError::MissingCredential("CLOUDFLARE_ACCOUNT_ID"))
    }

    fn zone(&self) -> Result<&str, CloudflareError> {
        self.scope
            .zone_id
            .as_deref()
            .ok_or(CloudflareError::MissingCredential("CLOUDFLARE_ZONE_ID"))
    }

    async fn result<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, CloudflareError> {
        let envelope = self.api.send(request).await?;
        decode(envelope.result)
    }

    // ------------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------------

    pub async fn upload_image(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<ImageDetails, CloudflareError> {
        validate_image_filename(filename)?;
        let path = format!("/accounts/{}/images/v1", self.account()?);
        self.result(ApiRequest::post(path).body(ApiBody::File {
            field: "file".to_string(),
            filename: filename.to_string(),
            bytes,
            content_type,
        }))
        .await
    }

    pub async fn delete_image(&self, image_id: &str) -> Result<(), CloudflareError> {
        let path = format!("/accounts/{}/images/v1/{}", self.account()?, image_id);
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn image_info(&self, image_id: &str) -> Result<ImageDetails, CloudflareError> {
        let path = format!("/accounts/{}/images/v1/{}", self.account()?, image_id);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn list_images(&self) -> Result<Vec<ImageDetails>, CloudflareError> {
        let path = format!("/accounts/{}/images/v2", self.account()?);
        let envelope = self.api.send(ApiRequest::get(path)).await?;
        decode_field(envelope.result, "images")
    }

    pub async fn image_stats(&self) -> Result<ImageStats, CloudflareError> {
        let path = format!("/accounts/{}/images/v1/stats", self.account()?);
        let envelope = self.api.send(ApiRequest::get(path)).await?;
        decode_field(envelope.result, "count")
    }

    // ------------------------------------------------------------------------
    // Zones, DNSSEC, bot management, load balancing
    // ------------------------------------------------------------------------

    /// Every zone visible to the token, following pagination.
    pub async fn list_zones(&self) -> Result<Vec<Zone>, CloudflareError> {
        let mut zones = Vec::new();
        let mut page = 1u32;
        loop {
            let envelope = self
                .api
                .send(
                    ApiRequest::get("/zones")
                        .query("page", page.to_string())
                        .query("per_page", "50"),
                )
                .await?;
            let batch: Vec<Zone> = decode(envelope.result)?;
            let fetched = batch.len();
            zones.extend(batch);

            let total_pages = match envelope.result_info {
                Some(info) => decode::<ResultInfo>(info)?.total_pages.unwrap_or(1),
                None => 1,
            };
            if fetched == 0 || page >= total_pages {
                break;
            }
            page += 1;
        }
        Ok(zones)
    }

    pub async fn dnssec_status(&self) -> Result<DnssecStatus, CloudflareError> {
        let path = format!("/zones/{}/dnssec", self.zone()?);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn delete_dnssec(&self) -> Result<(), CloudflareError> {
        let path = format!("/zones/{}/dnssec", self.zone()?);
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn bot_management(&self) -> Result<BotManagementConfig, CloudflareError> {
        let path = format!("/zones/{}/bot_management", self.zone()?);
        let config: BotManagementConfig = self.result(ApiRequest::get(path)).await?;
        if config.is_empty() {
            return Err(CloudflareError::NotFound(
                "No bot management config found.".to_string(),
            ));
        }
        Ok(config)
    }

    pub async fn update_bot_management(
        &self,
        setting: &str,
        enabled: bool,
    ) -> Result<BotManagementConfig, CloudflareError> {
        let setting = setting.trim();
        if setting.is_empty() || !setting.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CloudflareError::InvalidInput(format!(
                "`{setting}` is not a bot management setting."
            )));
        }
        let path = format!("/zones/{}/bot_management", self.zone()?);
        let mut body = serde_json::Map::new();
        body.insert(setting.to_string(), Value::Bool(enabled));
        self.result(ApiRequest::put(path).json(Value::Object(body)))
            .await
    }

    pub async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, CloudflareError> {
        let path = format!("/zones/{}/load_balancers", self.zone()?);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn load_balancer(&self, id: &str) -> Result<LoadBalancer, CloudflareError> {
        let path = format!("/zones/{}/load_balancers/{}", self.zone()?, id);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn delete_load_balancer(&self, id: &str) -> Result<(), CloudflareError> {
        let path = format!("/zones/{}/load_balancers/{}", self.zone()?, id);
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Intel
    // ------------------------------------------------------------------------

    pub async fn whois(&self, domain: &str) -> Result<WhoisRecord, CloudflareError> {
        let domain = validate_domain(domain)?;
        let path = format!("/accounts/{}/intel/whois", self.account()?);
        let record: WhoisRecord = self
            .result(ApiRequest::get(path).query("domain", domain.clone()))
            .await?;
        if !record.found {
            return Err(CloudflareError::NotFound(format!(
                "No WHOIS record was found for `{domain}`."
            )));
        }
        Ok(record)
    }

    pub async fn domain_intel(&self, domain: &str) -> Result<DomainIntel, CloudflareError> {
        let domain = validate_domain(domain)?;
        let path = format!("/accounts/{}/intel/domain", self.account()?);
        self.result(ApiRequest::get(path).query("domain", domain))
            .await
    }

    pub async fn ip_intel(&self, ip: &str) -> Result<IpIntel, CloudflareError> {
        let (ip, version) = validate_public_ip(ip)?;
        let path = format!("/accounts/{}/intel/ip", self.account()?);
        let results: Vec<IpIntel> = self
            .result(ApiRequest::get(path).query(version.query_key(), ip.to_string()))
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| CloudflareError::NotFound(format!("No intelligence for `{ip}`.")))
    }

    pub async fn domain_history(&self, domain: &str) -> Result<DomainHistory, CloudflareError> {
        let domain = validate_domain(domain)?;
        let path = format!("/accounts/{}/intel/domain-history", self.account()?);
        let results: Vec<DomainHistory> = self
            .result(ApiRequest::get(path).query("domain", domain.clone()))
            .await?;
        results
            .into_iter()
            .next()
            .filter(|history| !history.categorizations.is_empty())
            .ok_or_else(|| {
                CloudflareError::NotFound(format!("No history is available for `{domain}`."))
            })
    }

    pub async fn asn(&self, asn: u64) -> Result<AsnIntel, CloudflareError> {
        let path = format!("/accounts/{}/intel/asn/{}", self.account()?, asn);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn asn_subnets(&self, asn: u64) -> Result<AsnSubnets, CloudflareError> {
        let path = format!("/accounts/{}/intel/asn/{}/subnets", self.account()?, asn);
        let subnets: AsnSubnets = self.result(ApiRequest::get(path)).await?;
        if subnets.subnets.is_empty() {
            return Err(CloudflareError::NotFound(format!(
                "No subnets were found for ASN {asn}."
            )));
        }
        Ok(subnets)
    }

    // ------------------------------------------------------------------------
    // URL scanner
    // ------------------------------------------------------------------------

    pub async fn search_scans(&self, query: &str) -> Result<Vec<ScanTask>, CloudflareError> {
        let path = format!("/accounts/{}/urlscanner/scan", self.account()?);
        let envelope = self
            .api
            .send(ApiRequest::get(path).query("query", query.trim()))
            .await?;
        decode_field(envelope.result, "tasks")
    }

    pub async fn submit_scan(&self, url: &str) -> Result<ScanSubmission, CloudflareError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CloudflareError::InvalidInput(
                "The URL must start with `http://` or `https://`.".to_string(),
            ));
        }
        let path = format!("/accounts/{}/urlscanner/scan", self.account()?);
        let submission: ScanSubmission = self
            .result(ApiRequest::post(path).json(json!({ "url": url })))
            .await?;
        if submission.uuid.is_empty() {
            return Err(CloudflareError::Decode("scan submission had no uuid".into()));
        }
        Ok(submission)
    }

    /// Finished report for a scan, or `NotReady` while it is still running.
    pub async fn scan_report(&self, scan_id: &str) -> Result<ScanReport, CloudflareError> {
        let path = format!("/accounts/{}/urlscanner/scan/{}", self.account()?, scan_id);
        let envelope = self.api.send(ApiRequest::get(path)).await?;
        match envelope.result.get("scan") {
            Some(scan) if !scan.is_null() => decode(scan.clone()),
            _ => Err(CloudflareError::NotFound(
                "No relevant data found in the scan result.".to_string(),
            )),
        }
    }

    /// Poll until the report is ready.
    pub async fn wait_for_scan(&self, scan_id: &str) -> Result<ScanReport, CloudflareError> {
        for attempt in 1..=self.scan_max_polls {
            tokio::time::sleep(self.scan_poll_interval).await;
            match self.scan_report(scan_id).await {
                Err(CloudflareError::NotReady) => {
                    tracing::debug!(scan_id, attempt, "URL scan still running");
                }
                other => return other,
            }
        }
        Err(CloudflareError::NotReady)
    }

    pub async fn scan_har(&self, scan_id: &str) -> Result<Value, CloudflareError> {
        let path = format!("/accounts/{}/urlscanner/scan/{}/har", self.account()?, scan_id);
        let envelope = self.api.send(ApiRequest::get(path)).await?;
        Ok(envelope.result)
    }

    pub async fn scan_screenshot(&self, scan_id: &str) -> Result<Vec<u8>, CloudflareError> {
        let path = format!(
            "/accounts/{}/urlscanner/scan/{}/screenshot",
            self.account()?,
            scan_id
        );
        self.api.fetch_bytes(ApiRequest::get(path)).await
    }

    pub async fn set_autoscan(&self, guild_id: u64, enabled: bool) -> Result<(), CloudflareError> {
        self.autoscan.set_enabled(guild_id, enabled).await
    }

    pub async fn autoscan_enabled(&self, guild_id: u64) -> Result<bool, CloudflareError> {
        self.autoscan.is_enabled(guild_id).await
    }

    /// Scan every link in a message for a guild that opted in.
    ///
    /// Returns the first URL Cloudflare flagged as malicious. Links that fail
    /// to submit or never finish are skipped.
    pub async fn autoscan_message(
        &self,
        guild_id: u64,
        content: &str,
    ) -> Result<Option<String>, CloudflareError> {
        let urls = scannable_urls(content);
        if urls.is_empty() || !self.autoscan.is_enabled(guild_id).await? {
            return Ok(None);
        }

        for url in urls {
            let submission = match self.submit_scan(&url).await {
                Ok(submission) => submission,
                Err(e) => {
                    tracing::debug!(guild_id, %url, error = %e, "Auto-scan submit skipped");
                    continue;
                }
            };

            match self.wait_for_scan(&submission.uuid).await {
                Ok(report) if report.is_malicious() => {
                    tracing::info!(guild_id, %url, scan_id = %submission.uuid, "Auto-scan flagged URL");
                    return Ok(Some(url));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(guild_id, %url, error = %e, "Auto-scan did not complete");
                }
            }
        }

        Ok(None)
    }

    // ------------------------------------------------------------------------
    // Email routing
    // ------------------------------------------------------------------------

    pub async fn list_email_addresses(&self) -> Result<Vec<EmailAddress>, CloudflareError> {
        let path = format!("/accounts/{}/email/routing/addresses", self.account()?);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn add_email_address(&self, email: &str) -> Result<EmailAddress, CloudflareError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(CloudflareError::InvalidInput(format!(
                "`{email}` is not an email address."
            )));
        }
        let path = format!("/accounts/{}/email/routing/addresses", self.account()?);
        self.result(ApiRequest::post(path).json(json!({ "email": email })))
            .await
    }

    /// Look up a destination address by its email.
    pub async fn find_email_address(&self, email: &str) -> Result<EmailAddress, CloudflareError> {
        let wanted = email.trim();
        self.list_email_addresses()
            .await?
            .into_iter()
            .find(|address| address.email.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CloudflareError::NotFound(format!(
                    "No email routing address found for **`{wanted}`**."
                ))
            })
    }

    pub async fn remove_email_address(&self, address_id: &str) -> Result<(), CloudflareError> {
        let path = format!(
            "/accounts/{}/email/routing/addresses/{}",
            self.account()?,
            address_id
        );
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn email_routing_settings(&self) -> Result<EmailRoutingSettings, CloudflareError> {
        let path = format!("/zones/{}/email/routing", self.zone()?);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn set_email_routing(
        &self,
        enabled: bool,
    ) -> Result<EmailRoutingSettings, CloudflareError> {
        let action = if enabled { "enable" } else { "disable" };
        let path = format!("/zones/{}/email/routing/{}", self.zone()?, action);
        self.result(ApiRequest::post(path).json(json!({}))).await
    }

    pub async fn email_routing_dns(&self) -> Result<Vec<DnsRecord>, CloudflareError> {
        let path = format!("/zones/{}/email/routing/dns", self.zone()?);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn list_email_rules(&self) -> Result<Vec<EmailRule>, CloudflareError> {
        let path = format!("/zones/{}/email/routing/rules", self.zone()?);
        self.result(ApiRequest::get(path)).await
    }

    /// Forward mail sent to `source` on to `destination`.
    pub async fn add_email_rule(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<EmailRule, CloudflareError> {
        let path = format!("/zones/{}/email/routing/rules", self.zone()?);
        let matcher = RuleMatcher {
            kind: "literal".to_string(),
            field: Some("to".to_string()),
            value: Some(source.trim().to_string()),
        };
        let action = RuleAction {
            kind: "forward".to_string(),
            value: vec![destination.trim().to_string()],
        };
        let body = json!({
            "name": format!("Forward {} to {}", source.trim(), destination.trim()),
            "enabled": true,
            "matchers": [matcher],
            "actions": [action],
        });
        self.result(ApiRequest::post(path).json(body)).await
    }

    pub async fn remove_email_rule(&self, rule_id: &str) -> Result<(), CloudflareError> {
        let path = format!("/zones/{}/email/routing/rules/{}", self.zone()?, rule_id);
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Hyperdrive
    // ------------------------------------------------------------------------

    pub async fn list_hyperdrives(&self) -> Result<Vec<Hyperdrive>, CloudflareError> {
        let path = format!("/accounts/{}/hyperdrive/configs", self.account()?);
        self.result(ApiRequest::get(path)).await
    }

    pub async fn create_hyperdrive(
        &self,
        config: NewHyperdrive,
    ) -> Result<Hyperdrive, CloudflareError> {
        let path = format!("/accounts/{}/hyperdrive/configs", self.account()?);
        let body = Hyperdrive {
            id: String::new(),
            name: config.name,
            origin: HyperdriveOrigin {
                host: config.host,
                port: Some(config.port),
                database: config.database,
                scheme: config.scheme,
                user: config.user,
                password: Some(config.password),
            },
            caching: HyperdriveCaching {
                disabled: config.caching_disabled,
                max_age: config.max_age,
                stale_while_revalidate: config.stale_while_revalidate,
            },
        };
        let body = serde_json::to_value(body).map_err(|e| CloudflareError::Decode(e.to_string()))?;
        self.result(ApiRequest::post(path).json(body)).await
    }

    pub async fn hyperdrive(&self, id: &str) -> Result<Hyperdrive, CloudflareError> {
        let path = format!("/accounts/{}/hyperdrive/configs/{}", self.account()?, id);
        self.result(ApiRequest::get(path)).await
    }

    /// Apply a JSON object of changes to a config.
    pub async fn patch_hyperdrive(
        &self,
        id: &str,
        changes: &str,
    ) -> Result<Hyperdrive, CloudflareError> {
        let changes: Value = serde_json::from_str(changes).map_err(|_| {
            CloudflareError::InvalidInput("Invalid JSON format for changes.".to_string())
        })?;
        if !changes.is_object() {
            return Err(CloudflareError::InvalidInput(
                "Changes must be a JSON object.".to_string(),
            ));
        }
        let path = format!("/accounts/{}/hyperdrive/configs/{}", self.account()?, id);
        self.result(ApiRequest::patch(path).json(changes)).await
    }

    pub async fn delete_hyperdrive(&self, id: &str) -> Result<(), CloudflareError> {
        let path = format!("/accounts/{}/hyperdrive/configs/{}", self.account()?, id);
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // R2
    // ------------------------------------------------------------------------

    pub async fn create_bucket(
        &self,
        name: &str,
        location_hint: &str,
    ) -> Result<R2Bucket, CloudflareError> {
        let hint = validate_location_hint(location_hint)?;
        let path = format!("/accounts/{}/r2/buckets", self.account()?);
        self.result(ApiRequest::post(path).json(json!({
            "name": name.trim(),
            "locationHint": hint,
        })))
        .await
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<(), CloudflareError> {
        let path = format!(
            "/accounts/{}/r2/buckets/{}",
            self.account()?,
            path_segment(name.trim())
        );
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn bucket_info(&self, name: &str) -> Result<R2Bucket, CloudflareError> {
        let path = format!(
            "/accounts/{}/r2/buckets/{}",
            self.account()?,
            path_segment(name.trim())
        );
        self.result(ApiRequest::get(path)).await
    }

    pub async fn stash_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<R2Object, CloudflareError> {
        if bytes.len() as u64 > MAX_STASH_BYTES {
            return Err(CloudflareError::TooLarge(
                "The file is too large. Maximum allowed size is 300 MB.".to_string(),
            ));
        }
        let path = self.object_path(bucket, key)?;
        self.result(ApiRequest::put(path).body(ApiBody::Bytes {
            bytes,
            content_type: "application/octet-stream".to_string(),
        }))
        .await
    }

    pub async fn recycle_object(&self, bucket: &str, key: &str) -> Result<(), CloudflareError> {
        let path = self.object_path(bucket, key)?;
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CloudflareError> {
        let path = self.object_path(bucket, key)?;
        self.api
            .fetch_bytes(ApiRequest::get(path).max_bytes(MAX_FETCH_BYTES))
            .await
            .map_err(|e| match e {
                CloudflareError::TooLarge(_) => CloudflareError::TooLarge(
                    "The file is larger than 25 MB and cannot be sent to Discord.".to_string(),
                ),
                other => other,
            })
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<String, CloudflareError> {
        Ok(format!(
            "/accounts/{}/r2/buckets/{}/objects/{}",
            self.account()?,
            path_segment(bucket.trim()),
            path_segment(key)
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records what was asked for.
    #[derive(Default)]
    struct MockApi {
        responses: Mutex<VecDeque<Result<ApiEnvelope, CloudflareError>>>,
        bytes: Mutex<Option<Vec<u8>>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockApi {
        fn with(responses: Vec<Result<Value, CloudflareError>>) -> Self {
            let api = Self::default();
            *api.responses.lock().unwrap() = responses
                .into_iter()
                .map(|r| {
                    r.map(|result| ApiEnvelope {
                        result,
                        result_info: None,
                    })
                })
                .collect();
            api
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CloudflareApi for MockApi {
        async fn send(&self, request: ApiRequest) -> Result<ApiEnvelope, CloudflareError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiEnvelope::default()))
        }

        async fn fetch_bytes(&self, request: ApiRequest) -> Result<Vec<u8>, CloudflareError> {
            let limit = request.max_bytes;
            self.requests.lock().unwrap().push(request);
            let bytes = self.bytes.lock().unwrap().clone().unwrap_or_default();
            match limit {
                Some(limit) if bytes.len() as u64 > limit => {
                    Err(CloudflareError::TooLarge(format!("over {limit} bytes")))
                }
                _ => Ok(bytes),
            }
        }
    }

    #[derive(Default)]
    struct MockAutoscanStore {
        guilds: DashMap<u64, bool>,
    }

    #[async_trait]
    impl AutoscanStore for MockAutoscanStore {
        async fn is_enabled(&self, guild_id: u64) -> Result<bool, CloudflareError> {
            Ok(self.guilds.get(&guild_id).map(|v| *v).unwrap_or(false))
        }

        async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), CloudflareError> {
            self.guilds.insert(guild_id, enabled);
            Ok(())
        }
    }

    fn scope() -> CloudflareScope {
        CloudflareScope {
            account_id: Some("acc".to_string()),
            zone_id: Some("zone".to_string()),
        }
    }

    fn service(api: MockApi) -> CloudflareService<MockApi, MockAutoscanStore> {
        CloudflareService::new(api, MockAutoscanStore::default(), scope())
            .with_scan_polling(Duration::ZERO, 3)
    }

    #[tokio::test]
    async fn missing_account_is_reported_before_any_request() {
        let svc = CloudflareService::new(
            MockApi::default(),
            MockAutoscanStore::default(),
            CloudflareScope::default(),
        );
        assert!(matches!(
            svc.list_images().await,
            Err(CloudflareError::MissingCredential("CLOUDFLARE_ACCOUNT_ID"))
        ));
        assert!(matches!(
            svc.dnssec_status().await,
            Err(CloudflareError::MissingCredential("CLOUDFLARE_ZONE_ID"))
        ));
        assert!(svc.api.requests().is_empty());
    }

    #[tokio::test]
    async fn ip_intel_sends_versioned_parameter() {
        let svc = service(MockApi::with(vec![Ok(json!([{
            "ip": "1.1.1.1",
            "belongs_to_ref": { "description": "CLOUDFLARENET", "country": "US", "type": "hosting" }
        }]))]));

        let intel = svc.ip_intel("1.1.1.1").await.unwrap();
        assert_eq!(intel.belongs_to_ref.unwrap().kind.as_deref(), Some("hosting"));

        let request = &svc.api.requests()[0];
        assert_eq!(request.path, "/accounts/acc/intel/ip");
        assert_eq!(request.query, vec![("ipv4".to_string(), "1.1.1.1".to_string())]);
    }

    #[tokio::test]
    async fn private_ip_never_reaches_the_api() {
        let svc = service(MockApi::default());
        assert!(matches!(
            svc.ip_intel("192.168.0.1").await,
            Err(CloudflareError::InvalidInput(_))
        ));
        assert!(svc.api.requests().is_empty());
    }

    #[tokio::test]
    async fn images_list_reads_nested_array() {
        let svc = service(MockApi::with(vec![Ok(json!({
            "images": [{ "id": "img1", "filename": "cat.png", "variants": ["https://x/public"] }]
        }))]));
        let images = svc.list_images().await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename.as_deref(), Some("cat.png"));
    }

    #[tokio::test]
    async fn upload_rejects_non_images() {
        let svc = service(MockApi::default());
        let result = svc.upload_image("notes.txt", vec![1, 2, 3], None).await;
        assert!(matches!(result, Err(CloudflareError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn scan_waits_until_report_is_ready() {
        let svc = service(MockApi::with(vec![
            Err(CloudflareError::NotReady),
            Ok(json!({ "scan": {
                "task": { "uuid": "abc", "url": "https://bad.example" },
                "verdicts": { "overall": { "malicious": true, "categories": [{ "name": "Phishing" }] } }
            }})),
        ]));

        let report = svc.wait_for_scan("abc").await.unwrap();
        assert!(report.is_malicious());
        assert_eq!(report.verdicts.overall.categories[0].name, "Phishing");
        assert_eq!(svc.api.requests().len(), 2);
    }

    #[tokio::test]
    async fn scan_gives_up_after_max_polls() {
        let svc = service(MockApi::with(vec![
            Err(CloudflareError::NotReady),
            Err(CloudflareError::NotReady),
            Err(CloudflareError::NotReady),
        ]));
        assert!(matches!(
            svc.wait_for_scan("abc").await,
            Err(CloudflareError::NotReady)
        ));
    }

    #[tokio::test]
    async fn autoscan_is_skipped_when_disabled() {
        let svc = service(MockApi::default());
        let flagged = svc
            .autoscan_message(1, "go to https://bad.example now")
            .await
            .unwrap();
        assert!(flagged.is_none());
        assert!(svc.api.requests().is_empty());
    }

    #[tokio::test]
    async fn autoscan_flags_malicious_link() {
        let svc = service(MockApi::with(vec![
            Ok(json!({ "uuid": "scan-1" })),
            Ok(json!({ "scan": { "verdicts": { "overall": { "malicious": true } } } })),
        ]));
        svc.set_autoscan(1, true).await.unwrap();

        let flagged = svc
            .autoscan_message(1, "go to https://bad.example now")
            .await
            .unwrap();
        assert_eq!(flagged.as_deref(), Some("https://bad.example"));
    }

    #[tokio::test]
    async fn email_address_is_found_by_email() {
        let svc = service(MockApi::with(vec![Ok(json!([
            { "id": "a1", "email": "one@example.com" },
            { "id": "a2", "email": "Two@Example.com" }
        ]))]));
        let address = svc.find_email_address("two@example.com").await.unwrap();
        assert_eq!(address.id, "a2");
    }

    #[tokio::test]
    async fn email_rule_body_uses_forward_action() {
        let svc = service(MockApi::with(vec![Ok(json!({ "id": "r1" }))]));
        svc.add_email_rule("hi@example.com", "me@example.org")
            .await
            .unwrap();

        let request = &svc.api.requests()[0];
        let ApiBody::Json(body) = &request.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["matchers"][0]["value"], "hi@example.com");
        assert_eq!(body["actions"][0]["type"], "forward");
        assert_eq!(body["actions"][0]["value"][0], "me@example.org");
    }

    #[tokio::test]
    async fn hyperdrive_patch_needs_json_object() {
        let svc = service(MockApi::default());
        assert!(svc.patch_hyperdrive("h1", "not json").await.is_err());
        assert!(svc.patch_hyperdrive("h1", "[1, 2]").await.is_err());
        assert!(svc.api.requests().is_empty());
    }

    #[tokio::test]
    async fn bucket_creation_validates_hint() {
        let svc = service(MockApi::with(vec![Ok(json!({ "name": "logs", "location": "weur" }))]));
        assert!(svc.create_bucket("logs", "moon").await.is_err());

        let bucket = svc.create_bucket("logs", "WEUR").await.unwrap();
        assert_eq!(bucket.location.as_deref(), Some("weur"));
        let ApiBody::Json(body) = &svc.api.requests()[0].body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["locationHint"], "weur");
    }

    #[tokio::test]
    async fn large_objects_are_not_fetched_into_discord() {
        let api = MockApi::default();
        *api.bytes.lock().unwrap() = Some(vec![0u8; (MAX_FETCH_BYTES + 1) as usize]);
        let svc = service(api);
        assert!(matches!(
            svc.fetch_object("bucket", "big.bin").await,
            Err(CloudflareError::TooLarge(msg)) if msg.contains("25 MB")
        ));
        assert_eq!(svc.api.requests()[0].max_bytes, Some(MAX_FETCH_BYTES));
    }

    #[tokio::test]
    async fn object_keys_are_percent_encoded() {
        let svc = service(MockApi::default());
        svc.fetch_object("bucket", "my file?.txt").await.unwrap();
        svc.recycle_object("bucket", "a#b/100%").await.unwrap();
        // The empty canned result doesn't decode; only the path matters here.
        let _ = svc.stash_object("bucket", "..", vec![1]).await;

        let paths: Vec<String> = svc.api.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/accounts/acc/r2/buckets/bucket/objects/my%20file%3F.txt",
                "/accounts/acc/r2/buckets/bucket/objects/a%23b%2F100%25",
                "/accounts/acc/r2/buckets/bucket/objects/%2E%2E",
            ]
        );
    }

    #[tokio::test]
    async fn autoscan_flag_reads_back() {
        let svc = service(MockApi::default());
        assert!(!svc.autoscan_enabled(7).await.unwrap());
        svc.set_autoscan(7, true).await.unwrap();
        assert!(svc.autoscan_enabled(7).await.unwrap());
        svc.set_autoscan(7, false).await.unwrap();
        assert!(!svc.autoscan_enabled(7).await.unwrap());
    }
}
