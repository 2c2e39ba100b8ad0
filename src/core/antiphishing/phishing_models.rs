// Anti-phishing domain models.
//
// Pure data, no Discord types. The Discord layer maps `PhishingAction`
// onto message deletes, kicks and bans.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest domain string we keep in verdicts and case logs.
pub const MAX_DOMAIN_LEN: usize = 250;

/// What happens when a member posts a block-listed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PhishingAction {
    /// Protection disabled.
    Ignore,
    /// Warn the channel and ping moderators.
    #[default]
    Notify,
    /// Remove the message.
    Delete,
    /// Remove the message and kick the sender.
    Kick,
    /// Remove the message and ban the sender.
    Ban,
}

impl PhishingAction {
    pub const ALL: [PhishingAction; 5] = [
        PhishingAction::Ignore,
        PhishingAction::Notify,
        PhishingAction::Delete,
        PhishingAction::Kick,
        PhishingAction::Ban,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhishingAction::Ignore => "ignore",
            PhishingAction::Notify => "notify",
            PhishingAction::Delete => "delete",
            PhishingAction::Kick => "kick",
            PhishingAction::Ban => "ban",
        }
    }

    /// Human description shown when the setting changes.
    pub fn describe(&self) -> &'static str {
        match self {
            PhishingAction::Ignore => {
                "Phishing protection is now **disabled**. Malicious links will not trigger any actions."
            }
            PhishingAction::Notify => {
                "Malicious links will now trigger a **notification** in the channel when detected."
            }
            PhishingAction::Delete => {
                "Malicious links will now be **deleted** from conversation when detected."
            }
            PhishingAction::Kick => {
                "Malicious links will be **deleted** and the sender will be **kicked** when detected."
            }
            PhishingAction::Ban => {
                "Malicious links will be **deleted** and the sender will be **banned** when detected."
            }
        }
    }

    /// Whether enforcing this action removes the offending message.
    pub fn removes_message(&self) -> bool {
        matches!(
            self,
            PhishingAction::Delete | PhishingAction::Kick | PhishingAction::Ban
        )
    }
}

impl fmt::Display for PhishingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PhishingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(PhishingAction::Ignore),
            "notify" => Ok(PhishingAction::Notify),
            "delete" => Ok(PhishingAction::Delete),
            "kick" => Ok(PhishingAction::Kick),
            "ban" => Ok(PhishingAction::Ban),
            other => Err(format!("unknown phishing action `{other}`")),
        }
    }
}

/// Per-guild anti-phishing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildPhishingSettings {
    pub action: PhishingAction,
    /// Links a member may share before the action escalates to a ban.
    pub max_links: u32,
    /// Channel that receives a case embed for every enforcement.
    pub log_channel_id: Option<u64>,
    /// Role pinged alongside notify warnings.
    pub mod_role_id: Option<u64>,
}

impl Default for GuildPhishingSettings {
    fn default() -> Self {
        Self {
            action: PhishingAction::Notify,
            max_links: 3,
            log_channel_id: None,
            mod_role_id: None,
        }
    }
}

/// Lifetime counters for a guild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhishingStats {
    pub caught: u64,
    pub notifications: u64,
    pub deletions: u64,
    pub kicks: u64,
    pub bans: u64,
}

/// Decision for a message that contained a block-listed domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhishingVerdict {
    pub domain: String,
    pub action: PhishingAction,
    /// How many malicious links this member has now shared in the guild.
    pub member_caught: u32,
    /// True when the guild action was overridden because of `max_links`.
    pub escalated: bool,
}

/// Result of a manual `/checkphish` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCheck {
    Detected { domain: String },
    Clean { domain: String },
}
