// Cloudflare API resource models.
//
// Only the fields the bot renders are modelled. Everything is defaulted so a
// sparse response still deserializes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ id?, name }` pairs used all over the intel endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NamedRef {
    pub id: Option<Value>,
    pub name: String,
}

/// `result_info` block on paged list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResultInfo {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub count: Option<u32>,
    pub total_count: Option<u32>,
    pub total_pages: Option<u32>,
}

// ============================================================================
// IMAGES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageDetails {
    pub id: String,
    pub filename: Option<String>,
    pub uploaded: Option<String>,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageStats {
    pub allowed: u64,
    pub current: u64,
}

// ============================================================================
// ZONES / DNSSEC / BOT MANAGEMENT / LOAD BALANCING
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnssecStatus {
    pub status: Option<String>,
    pub algorithm: Option<String>,
    pub digest: Option<String>,
    pub digest_algorithm: Option<String>,
    pub digest_type: Option<String>,
    pub ds: Option<String>,
    pub flags: Option<u64>,
    pub key_tag: Option<u64>,
    pub key_type: Option<String>,
    pub public_key: Option<String>,
    pub modified_on: Option<String>,
    pub dnssec_multi_signer: Option<bool>,
    pub dnssec_presigned: Option<bool>,
}

impl DnssecStatus {
    /// Status label as shown to users.
    pub fn status_label(&self) -> &'static str {
        match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("active") => "ACTIVE",
            Some("pending") => "PENDING ACTIVATION",
            Some("disabled") => "DISABLED",
            Some("pending-disabled") => "PENDING DEACTIVATION",
            Some("error") => "ERROR",
            _ => "UNKNOWN",
        }
    }
}

/// Bot management settings are a flat object whose keys depend on the plan.
pub type BotManagementConfig = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub proxied: Option<bool>,
    pub ttl: Option<u64>,
    pub fallback_pool: Option<String>,
    pub default_pools: Vec<String>,
    pub steering_policy: Option<String>,
    pub session_affinity: Option<String>,
    pub created_on: Option<String>,
    pub modified_on: Option<String>,
}

// ============================================================================
// INTEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WhoisRecord {
    pub domain: Option<String>,
    pub found: bool,
    pub registrar: Option<String>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub expiration_date: Option<String>,
    pub dnssec: Option<bool>,
    pub nameservers: Vec<String>,
    pub status: Vec<String>,
    pub whois_server: Option<String>,
    pub registrar_email: Option<String>,
    pub registrar_phone: Option<String>,
}

impl Default for WhoisRecord {
    fn default() -> Self {
        Self {
            domain: None,
            found: true,
            registrar: None,
            created_date: None,
            updated_date: None,
            expiration_date: None,
            dnssec: None,
            nameservers: Vec::new(),
            status: Vec::new(),
            whois_server: None,
            registrar_email: None,
            registrar_phone: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdditionalInformation {
    pub suspected_malware_family: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolvesTo {
    pub id: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DomainIntel {
    pub domain: String,
    pub risk_score: Option<f64>,
    pub popularity_rank: Option<u64>,
    pub application: Option<NamedRef>,
    pub content_categories: Vec<NamedRef>,
    pub risk_types: Vec<NamedRef>,
    pub inherited_from: Option<String>,
    pub inherited_content_categories: Vec<NamedRef>,
    pub inherited_risk_types: Vec<NamedRef>,
    pub additional_information: Option<AdditionalInformation>,
    pub resolves_to_refs: Vec<ResolvesTo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IpOwner {
    pub description: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IpIntel {
    pub ip: String,
    pub belongs_to_ref: Option<IpOwner>,
    pub risk_types: Vec<NamedRef>,
    pub ptr_lookup: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Categorization {
    pub categories: Vec<NamedRef>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DomainHistory {
    pub domain: String,
    pub categorizations: Vec<Categorization>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AsnIntel {
    pub asn: u64,
    pub description: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub risk_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AsnSubnets {
    pub asn: u64,
    pub ip_count_total: Option<u64>,
    pub subnets: Vec<String>,
}

// ============================================================================
// URL SCANNER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanTask {
    pub uuid: String,
    pub url: String,
    #[serde(rename = "effectiveUrl")]
    pub effective_url: Option<String>,
    pub country: Option<String>,
    pub success: Option<bool>,
    pub status: Option<String>,
    pub time: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanSubmission {
    pub uuid: String,
    pub url: Option<String>,
    pub visibility: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverallVerdict {
    pub malicious: bool,
    pub categories: Vec<NamedRef>,
    pub phishing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanVerdicts {
    pub overall: OverallVerdict,
}

/// The `scan` object of a finished report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanReport {
    pub task: ScanTask,
    pub verdicts: ScanVerdicts,
}

impl ScanReport {
    pub fn is_malicious(&self) -> bool {
        self.verdicts.overall.malicious
    }

    /// Public report page for a scan.
    pub fn radar_url(scan_id: &str) -> String {
        format!("https://radar.cloudflare.com/scan/{scan_id}")
    }
}

// ============================================================================
// EMAIL ROUTING
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmailAddress {
    pub id: String,
    pub email: String,
    pub verified: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmailRoutingSettings {
    pub id: Option<String>,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub status: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub skip_wizard: Option<bool>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub content: String,
    pub priority: Option<u64>,
    pub ttl: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleMatcher {
    #[serde(rename = "type")]
    pub kind: String,
    pub field: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmailRule {
    pub id: String,
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<i64>,
    pub tag: Option<String>,
    pub actions: Vec<RuleAction>,
    pub matchers: Vec<RuleMatcher>,
}

// ============================================================================
// HYPERDRIVE / R2
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HyperdriveOrigin {
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub scheme: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HyperdriveCaching {
    pub disabled: bool,
    pub max_age: Option<u64>,
    pub stale_while_revalidate: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Hyperdrive {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub origin: HyperdriveOrigin,
    pub caching: HyperdriveCaching,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct R2Bucket {
    pub name: String,
    pub creation_date: Option<String>,
    pub location: Option<String>,
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct R2Object {
    pub key: String,
    pub size: Option<u64>,
    pub etag: Option<String>,
    pub uploaded: Option<String>,
}
