// Anti-phishing service - block-list state and the graduated moderation policy.
//
// This service handles:
// - Refreshing the in-memory block-list from remote sources
// - Finding block-listed domains in message text
// - Deciding what to do about it (notify -> delete -> kick -> ban)
// - Per-guild and per-member counters
//
// NO Discord dependencies here - just pure domain logic.

use super::link_scanner::{domain_of, extract_links, is_blocked};
use super::phishing_models::{
    GuildPhishingSettings, LinkCheck, PhishingAction, PhishingStats, PhishingVerdict,
    MAX_DOMAIN_LEN,
};
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::RwLock;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PhishingError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Block-list fetch failed: {0}")]
    SourceError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Somewhere we can download known-malicious domains from.
#[async_trait]
pub trait BlocklistSource: Send + Sync {
    /// Fetch every domain this source knows about.
    async fn fetch_domains(&self) -> Result<Vec<String>, PhishingError>;
}

/// Which counter to bump after an action was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhishingCounter {
    Caught,
    Notifications,
    Deletions,
    Kicks,
    Bans,
}

/// Persistence for guild settings and counters.
#[async_trait]
pub trait PhishingStore: Send + Sync {
    async fn get_settings(&self, guild_id: u64) -> Result<GuildPhishingSettings, PhishingError>;

    async fn save_settings(
        &self,
        guild_id: u64,
        settings: GuildPhishingSettings,
    ) -> Result<(), PhishingError>;

    async fn get_stats(&self, guild_id: u64) -> Result<PhishingStats, PhishingError>;

    async fn increment_counter(
        &self,
        guild_id: u64,
        counter: PhishingCounter,
    ) -> Result<(), PhishingError>;

    /// Add one to a member's caught count and return the new value.
    async fn increment_member_caught(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<u32, PhishingError>;

    async fn get_member_caught(&self, guild_id: u64, user_id: u64) -> Result<u32, PhishingError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PhishingService<S: PhishingStore> {
    store: S,
    sources: Vec<Box<dyn BlocklistSource>>,
    domains: RwLock<HashSet<String>>,
}

impl<S: PhishingStore> PhishingService<S> {
    pub fn new(store: S, sources: Vec<Box<dyn BlocklistSource>>) -> Self {
        Self {
            store,
            sources,
            domains: RwLock::new(HashSet::new()),
        }
    }

    /// Download all sources and swap in the merged list.
    ///
    /// Sources that fail are skipped. If all of them fail the current list is
    /// kept and an error is returned. Returns the new list size on success.
    pub async fn refresh_blocklist(&self) -> Result<usize, PhishingError> {
        let mut merged = HashSet::new();
        let mut any_ok = false;
        let mut last_error = None;

        for source in &self.sources {
            match source.fetch_domains().await {
                Ok(domains) => {
                    any_ok = true;
                    merged.extend(
                        domains
                            .into_iter()
                            .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
                            .filter(|d| !d.is_empty()),
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Block-list source failed");
                    last_error = Some(e);
                }
            }
        }

        if !any_ok {
            return Err(last_error
                .unwrap_or_else(|| PhishingError::SourceError("no sources configured".into())));
        }

        let size = merged.len();
        *self.domains.write().await = merged;
        tracing::info!(domains = size, "Block-list refreshed");
        Ok(size)
    }

    /// Replace the block-list without going through the sources.
    #[cfg(test)]
    pub async fn load_domains<I: IntoIterator<Item = String>>(&self, domains: I) {
        let set = domains
            .into_iter()
            .map(|d| d.to_ascii_lowercase())
            .collect::<HashSet<_>>();
        *self.domains.write().await = set;
    }

    pub async fn blocklist_size(&self) -> usize {
        self.domains.read().await.len()
    }

    /// Whether a single domain is on the block-list.
    pub async fn is_domain_blocked(&self, domain: &str) -> bool {
        let domain = domain.trim().to_ascii_lowercase();
        is_blocked(&domain, &*self.domains.read().await)
    }

    /// First block-listed domain linked in `content`, if any.
    pub async fn find_malicious_domain(&self, content: &str) -> Option<String> {
        let links = extract_links(content);
        if links.is_empty() {
            return None;
        }

        let domains = self.domains.read().await;
        links
            .iter()
            .filter_map(|link| domain_of(link))
            .find(|domain| is_blocked(domain, &domains))
    }

    /// Scan a guild message and decide what should happen to it.
    ///
    /// Returns `None` for clean messages and when the guild has protection
    /// set to ignore. Counters are updated here; action counters are updated
    /// separately by [`record_enforcement`](Self::record_enforcement) once the
    /// action actually went through.
    pub async fn check_message(
        &self,
        guild_id: u64,
        user_id: u64,
        content: &str,
    ) -> Result<Option<PhishingVerdict>, PhishingError> {
        let Some(domain) = self.find_malicious_domain(content).await else {
            return Ok(None);
        };

        let settings = self.store.get_settings(guild_id).await?;
        if settings.action == PhishingAction::Ignore {
            tracing::debug!(guild_id, user_id, %domain, "Phishing link ignored by guild setting");
            return Ok(None);
        }

        self.store
            .increment_counter(guild_id, PhishingCounter::Caught)
            .await?;
        let member_caught = self.store.increment_member_caught(guild_id, user_id).await?;

        let escalated = member_caught >= settings.max_links && settings.action != PhishingAction::Ban;
        let action = if member_caught >= settings.max_links {
            PhishingAction::Ban
        } else {
            settings.action
        };

        let domain: String = domain.chars().take(MAX_DOMAIN_LEN).collect();

        tracing::info!(
            guild_id,
            user_id,
            %domain,
            action = %action,
            member_caught,
            escalated,
            "Malicious link detected"
        );

        Ok(Some(PhishingVerdict {
            domain,
            action,
            member_caught,
            escalated,
        }))
    }

    /// Bump the counter matching an action that was successfully enforced.
    pub async fn record_enforcement(
        &self,
        guild_id: u64,
        action: PhishingAction,
    ) -> Result<(), PhishingError> {
        let counter = match action {
            PhishingAction::Ignore => return Ok(()),
            PhishingAction::Notify => PhishingCounter::Notifications,
            PhishingAction::Delete => PhishingCounter::Deletions,
            PhishingAction::Kick => PhishingCounter::Kicks,
            PhishingAction::Ban => PhishingCounter::Bans,
        };
        self.store.increment_counter(guild_id, counter).await
    }

    /// Manual lookup for a single URL.
    pub async fn check_url(&self, url: &str) -> Result<LinkCheck, PhishingError> {
        let url = url.trim().trim_start_matches('<').trim_end_matches('>');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PhishingError::InvalidUrl(
                "The URL must start with `http://` or `https://`.".to_string(),
            ));
        }

        let domain = extract_links(url)
            .first()
            .and_then(|link| domain_of(link))
            .ok_or_else(|| PhishingError::InvalidUrl("You provided an invalid URL.".to_string()))?;

        if self.is_domain_blocked(&domain).await {
            Ok(LinkCheck::Detected { domain })
        } else {
            Ok(LinkCheck::Clean { domain })
        }
    }

    pub async fn settings(&self, guild_id: u64) -> Result<GuildPhishingSettings, PhishingError> {
        self.store.get_settings(guild_id).await
    }

    pub async fn stats(&self, guild_id: u64) -> Result<PhishingStats, PhishingError> {
        self.store.get_stats(guild_id).await
    }

    pub async fn member_caught(&self, guild_id: u64, user_id: u64) -> Result<u32, PhishingError> {
        self.store.get_member_caught(guild_id, user_id).await
    }

    pub async fn set_action(
        &self,
        guild_id: u64,
        action: PhishingAction,
    ) -> Result<(), PhishingError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.action = action;
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn set_max_links(&self, guild_id: u64, max_links: i64) -> Result<(), PhishingError> {
        if max_links < 1 {
            return Err(PhishingError::InvalidSetting(
                "The maximum number of malicious links must be at least 1.".to_string(),
            ));
        }
        let max_links = u32::try_from(max_links).map_err(|_| {
            PhishingError::InvalidSetting("That number is far too large.".to_string())
        })?;

        let mut settings = self.store.get_settings(guild_id).await?;
        settings.max_links = max_links;
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn set_log_channel(
        &self,
        guild_id: u64,
        channel_id: Option<u64>,
    ) -> Result<(), PhishingError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.log_channel_id = channel_id;
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn set_mod_role(
        &self,
        guild_id: u64,
        role_id: Option<u64>,
    ) -> Result<(), PhishingError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.mod_role_id = role_id;
        self.store.save_settings(guild_id, settings).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory store for testing
    #[derive(Default)]
    struct MockPhishingStore {
        settings: DashMap<u64, GuildPhishingSettings>,
        stats: DashMap<u64, PhishingStats>,
        members: DashMap<(u64, u64), u32>,
    }

    #[async_trait]
    impl PhishingStore for MockPhishingStore {
        async fn get_settings(
            &self,
            guild_id: u64,
        ) -> Result<GuildPhishingSettings, PhishingError> {
            Ok(self
                .settings
                .get(&guild_id)
                .map(|s| s.clone())
                .unwrap_or_default())
        }

        async fn save_settings(
            &self,
            guild_id: u64,
            settings: GuildPhishingSettings,
        ) -> Result<(), PhishingError> {
            self.settings.insert(guild_id, settings);
            Ok(())
        }

        async fn get_stats(&self, guild_id: u64) -> Result<PhishingStats, PhishingError> {
            Ok(self.stats.get(&guild_id).map(|s| *s).unwrap_or_default())
        }

        async fn increment_counter(
            &self,
            guild_id: u64,
            counter: PhishingCounter,
        ) -> Result<(), PhishingError> {
            let mut stats = self.stats.entry(guild_id).or_default();
            match counter {
                PhishingCounter::Caught => stats.caught += 1,
                PhishingCounter::Notifications => stats.notifications += 1,
                PhishingCounter::Deletions => stats.deletions += 1,
                PhishingCounter::Kicks => stats.kicks += 1,
                PhishingCounter::Bans => stats.bans += 1,
            }
            Ok(())
        }

        async fn increment_member_caught(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<u32, PhishingError> {
            let mut count = self.members.entry((guild_id, user_id)).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn get_member_caught(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<u32, PhishingError> {
            Ok(self
                .members
                .get(&(guild_id, user_id))
                .map(|c| *c)
                .unwrap_or(0))
        }
    }

    struct StaticSource(Result<Vec<String>, String>);

    #[async_trait]
    impl BlocklistSource for StaticSource {
        async fn fetch_domains(&self) -> Result<Vec<String>, PhishingError> {
            self.0.clone().map_err(PhishingError::SourceError)
        }
    }

    fn ok_source(domains: &[&str]) -> Box<dyn BlocklistSource> {
        Box::new(StaticSource(Ok(domains.iter().map(|d| d.to_string()).collect())))
    }

    fn failing_source() -> Box<dyn BlocklistSource> {
        Box::new(StaticSource(Err("503".to_string())))
    }

    async fn service_with(domains: &[&str]) -> PhishingService<MockPhishingStore> {
        let service = PhishingService::new(MockPhishingStore::default(), vec![ok_source(domains)]);
        service.refresh_blocklist().await.unwrap();
        service
    }

    #[tokio::test]
    async fn refresh_merges_and_dedupes_sources() {
        let service = PhishingService::new(
            MockPhishingStore::default(),
            vec![
                ok_source(&["evil.com", "Scam.net"]),
                failing_source(),
                ok_source(&["scam.net", "phish.org"]),
            ],
        );

        let size = service.refresh_blocklist().await.unwrap();
        assert_eq!(size, 3);
        assert!(service.is_domain_blocked("scam.net").await);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_list() {
        let service = PhishingService::new(MockPhishingStore::default(), vec![failing_source()]);
        service.load_domains(vec!["evil.com".to_string()]).await;

        assert!(service.refresh_blocklist().await.is_err());
        assert_eq!(service.blocklist_size().await, 1);
    }

    #[tokio::test]
    async fn clean_message_has_no_verdict() {
        let service = service_with(&["evil.com"]).await;
        let verdict = service
            .check_message(1, 2, "see https://docs.rs/tokio")
            .await
            .unwrap();
        assert!(verdict.is_none());
        assert_eq!(service.stats(1).await.unwrap().caught, 0);
    }

    #[tokio::test]
    async fn default_action_notifies_and_counts() {
        let service = service_with(&["evil.com"]).await;
        let verdict = service
            .check_message(1, 2, "free nitro https://evil.com/gift")
            .await
            .unwrap()
            .expect("should detect");

        assert_eq!(verdict.action, PhishingAction::Notify);
        assert_eq!(verdict.domain, "evil.com");
        assert_eq!(verdict.member_caught, 1);
        assert!(!verdict.escalated);
        assert_eq!(service.stats(1).await.unwrap().caught, 1);
    }

    #[tokio::test]
    async fn userinfo_links_are_caught_by_their_host() {
        let service = service_with(&["evil.com"]).await;
        for content in ["https://discord.com@evil.com/gift", "https://user:pw@evil.com/"] {
            let verdict = service.check_message(1, 2, content).await.unwrap();
            assert_eq!(verdict.map(|v| v.domain).as_deref(), Some("evil.com"));
        }
    }

    #[tokio::test]
    async fn repeat_offender_is_escalated_to_ban() {
        let service = service_with(&["evil.com"]).await;
        service.set_action(1, PhishingAction::Delete).await.unwrap();
        service.set_max_links(1, 2).await.unwrap();

        let first = service
            .check_message(1, 2, "https://evil.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.action, PhishingAction::Delete);

        let second = service
            .check_message(1, 2, "https://evil.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.action, PhishingAction::Ban);
        assert!(second.escalated);

        // A different member starts from zero.
        let other = service
            .check_message(1, 3, "https://evil.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(other.action, PhishingAction::Delete);
    }

    #[tokio::test]
    async fn ignore_disables_everything() {
        let service = service_with(&["evil.com"]).await;
        service.set_action(1, PhishingAction::Ignore).await.unwrap();
        service.set_max_links(1, 1).await.unwrap();

        let verdict = service.check_message(1, 2, "https://evil.com").await.unwrap();
        assert!(verdict.is_none());
        assert_eq!(service.stats(1).await.unwrap().caught, 0);
        assert_eq!(service.member_caught(1, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn enforcement_bumps_matching_counter() {
        let service = service_with(&[]).await;
        service
            .record_enforcement(1, PhishingAction::Kick)
            .await
            .unwrap();
        service
            .record_enforcement(1, PhishingAction::Ignore)
            .await
            .unwrap();

        let stats = service.stats(1).await.unwrap();
        assert_eq!(stats.kicks, 1);
        assert_eq!(stats.notifications + stats.deletions + stats.bans, 0);
    }

    #[tokio::test]
    async fn max_links_must_be_positive() {
        let service = service_with(&[]).await;
        assert!(matches!(
            service.set_max_links(1, 0).await,
            Err(PhishingError::InvalidSetting(_))
        ));
        assert_eq!(service.settings(1).await.unwrap().max_links, 3);
    }

    #[tokio::test]
    async fn manual_check_requires_scheme() {
        let service = service_with(&["evil.com"]).await;

        assert!(matches!(
            service.check_url("evil.com").await,
            Err(PhishingError::InvalidUrl(_))
        ));
        assert_eq!(
            service.check_url("<https://login.evil.com/x>").await.unwrap(),
            LinkCheck::Detected {
                domain: "login.evil.com".to_string()
            }
        );
        assert_eq!(
            service.check_url("https://example.org").await.unwrap(),
            LinkCheck::Clean {
                domain: "example.org".to_string()
            }
        );
    }
}
