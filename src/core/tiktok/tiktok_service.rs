// TikTok service - live alerts for followed creators and video downloads.
//
// Live state is kept in memory per creator. Polling compares each fresh
// reading with the previous one and raises alerts on offline -> live.

use super::tiktok_models::{normalize_handle, DownloadedVideo, LiveAlert, TikTokSettings};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum TikTokError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("TikTok user {0} is already being followed. Remove them first to add a new user.")]
    AlreadyFollowing(String),

    #[error("TikTok user {0} is not being followed.")]
    NotFollowing(String),

    #[error("`{0}` is not a valid TikTok username.")]
    InvalidUser(String),

    #[error("Live status check failed: {0}")]
    LiveCheck(String),

    #[error("This video may contain sensitive content and TikTok has restricted it behind a login.")]
    Restricted,

    #[error("Failed to download video: {0}")]
    Download(String),

    #[error("The video is {0} bytes, which is over Discord's 25 MB upload limit.")]
    TooLarge(u64),
}

// ============================================================================
// PORTS
// ============================================================================

#[async_trait]
pub trait TikTokStore: Send + Sync {
    async fn get_settings(&self, guild_id: u64) -> Result<TikTokSettings, TikTokError>;
    async fn save_settings(&self, guild_id: u64, settings: TikTokSettings) -> Result<(), TikTokError>;
    /// Every guild that follows a creator.
    async fn followed(&self) -> Result<Vec<(u64, TikTokSettings)>, TikTokError>;
    async fn delete_guild(&self, guild_id: u64) -> Result<(), TikTokError>;
}

/// Answers "is this creator streaming right now?".
#[async_trait]
pub trait LiveStatusClient: Send + Sync {
    async fn is_live(&self, creator: &str) -> Result<bool, TikTokError>;
}

#[async_trait]
pub trait VideoDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<DownloadedVideo, TikTokError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct TikTokService<S: TikTokStore, L: LiveStatusClient, D: VideoDownloader> {
    store: S,
    live_client: L,
    downloader: D,
    /// Last known live state per creator.
    live_state: DashMap<String, bool>,
}

impl<S: TikTokStore, L: LiveStatusClient, D: VideoDownloader> TikTokService<S, L, D> {
    pub fn new(store: S, live_client: L, downloader: D) -> Self {
        Self {
            store,
            live_client,
            downloader,
            live_state: DashMap::new(),
        }
    }

    pub async fn settings(&self, guild_id: u64) -> Result<TikTokSettings, TikTokError> {
        self.store.get_settings(guild_id).await
    }

    /// Follow a creator. A guild follows at most one.
    pub async fn follow(&self, guild_id: u64, user: &str) -> Result<String, TikTokError> {
        let handle = normalize_handle(user).ok_or_else(|| TikTokError::InvalidUser(user.to_string()))?;
        let mut settings = self.store.get_settings(guild_id).await?;
        if let Some(existing) = settings.tiktok_user {
            return Err(TikTokError::AlreadyFollowing(existing));
        }
        settings.tiktok_user = Some(handle.clone());
        self.store.save_settings(guild_id, settings).await?;
        tracing::info!(guild_id, creator = %handle, "Following TikTok creator");
        Ok(handle)
    }

    pub async fn unfollow(&self, guild_id: u64, user: &str) -> Result<String, TikTokError> {
        let handle = normalize_handle(user).ok_or_else(|| TikTokError::InvalidUser(user.to_string()))?;
        let mut settings = self.store.get_settings(guild_id).await?;
        if settings.tiktok_user.as_deref() != Some(handle.as_str()) {
            return Err(TikTokError::NotFollowing(handle));
        }
        settings.tiktok_user = None;
        self.store.save_settings(guild_id, settings).await?;
        self.drop_unfollowed_state(&handle).await?;
        Ok(handle)
    }

    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), TikTokError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.alert_channel_id = Some(channel_id);
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn set_role(&self, guild_id: u64, role_id: u64) -> Result<(), TikTokError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.alert_role_id = Some(role_id);
        self.store.save_settings(guild_id, settings).await
    }

    /// Flip auto-download and return the new value.
    pub async fn toggle_auto_download(&self, guild_id: u64) -> Result<bool, TikTokError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.auto_download = !settings.auto_download;
        let enabled = settings.auto_download;
        self.store.save_settings(guild_id, settings).await?;
        Ok(enabled)
    }

    /// The bot left a guild.
    pub async fn forget_guild(&self, guild_id: u64) -> Result<(), TikTokError> {
        let settings = self.store.get_settings(guild_id).await?;
        self.store.delete_guild(guild_id).await?;
        if let Some(creator) = settings.tiktok_user {
            self.drop_unfollowed_state(&creator).await?;
        }
        Ok(())
    }

    async fn drop_unfollowed_state(&self, creator: &str) -> Result<(), TikTokError> {
        let still_followed = self
            .store
            .followed()
            .await?
            .iter()
            .any(|(_, s)| s.tiktok_user.as_deref() == Some(creator));
        if !still_followed {
            self.live_state.remove(creator);
        }
        Ok(())
    }

    /// Check every followed creator and return alerts for new live streams.
    pub async fn poll_live(&self) -> Result<Vec<LiveAlert>, TikTokError> {
        let mut by_creator: BTreeMap<String, Vec<(u64, TikTokSettings)>> = BTreeMap::new();
        for (guild_id, settings) in self.store.followed().await? {
            if let Some(creator) = settings.tiktok_user.clone() {
                by_creator.entry(creator).or_default().push((guild_id, settings));
            }
        }

        let mut alerts = Vec::new();
        for (creator, guilds) in by_creator {
            let live = match self.live_client.is_live(&creator).await {
                Ok(live) => live,
                Err(e) => {
                    tracing::warn!(creator = %creator, error = %e, "TikTok live check failed");
                    continue;
                }
            };

            let was_live = self.live_state.insert(creator.clone(), live).unwrap_or(false);
            if !live || was_live {
                continue;
            }

            tracing::info!(creator = %creator, guilds = guilds.len(), "TikTok creator went live");
            alerts.extend(guilds.into_iter().filter_map(|(guild_id, settings)| {
                settings.alert_channel_id.map(|channel_id| LiveAlert {
                    guild_id,
                    creator: creator.clone(),
                    channel_id,
                    role_id: settings.alert_role_id,
                })
            }));
        }

        Ok(alerts)
    }

    pub async fn download(&self, url: &str) -> Result<DownloadedVideo, TikTokError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(TikTokError::Download("That is not a link.".to_string()));
        }
        self.downloader.download(url).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTikTokStore {
        guilds: DashMap<u64, TikTokSettings>,
    }

    #[async_trait]
    impl TikTokStore for MockTikTokStore {
        async fn get_settings(&self, guild_id: u64) -> Result<TikTokSettings, TikTokError> {
            Ok(self.guilds.get(&guild_id).map(|s| s.clone()).unwrap_or_default())
        }

        async fn save_settings(
            &self,
            guild_id: u64,
            settings: TikTokSettings,
        ) -> Result<(), TikTokError> {
            self.guilds.insert(guild_id, settings);
            Ok(())
        }

        async fn followed(&self) -> Result<Vec<(u64, TikTokSettings)>, TikTokError> {
            Ok(self
                .guilds
                .iter()
                .filter(|e| e.tiktok_user.is_some())
                .map(|e| (*e.key(), e.value().clone()))
                .collect())
        }

        async fn delete_guild(&self, guild_id: u64) -> Result<(), TikTokError> {
            self.guilds.remove(&guild_id);
            Ok(())
        }
    }

    /// Live states to report, per creator.
    #[derive(Default)]
    struct MockLiveClient {
        live: DashMap<String, bool>,
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl LiveStatusClient for MockLiveClient {
        async fn is_live(&self, creator: &str) -> Result<bool, TikTokError> {
            if *self.fail.lock().unwrap() {
                return Err(TikTokError::LiveCheck("timeout".to_string()));
            }
            Ok(self.live.get(creator).map(|v| *v).unwrap_or(false))
        }
    }

    struct NoDownloads;

    #[async_trait]
    impl VideoDownloader for NoDownloads {
        async fn download(&self, _url: &str) -> Result<DownloadedVideo, TikTokError> {
            Err(TikTokError::Restricted)
        }
    }

    type TestService = TikTokService<MockTikTokStore, MockLiveClient, NoDownloads>;

    fn service() -> TestService {
        TikTokService::new(MockTikTokStore::default(), MockLiveClient::default(), NoDownloads)
    }

    #[tokio::test]
    async fn one_creator_per_guild() {
        let svc = service();
        assert_eq!(svc.follow(1, "@Creator").await.unwrap(), "creator");
        assert!(matches!(
            svc.follow(1, "other").await,
            Err(TikTokError::AlreadyFollowing(existing)) if existing == "creator"
        ));
    }

    #[tokio::test]
    async fn unfollow_must_match() {
        let svc = service();
        svc.follow(1, "creator").await.unwrap();
        assert!(matches!(
            svc.unfollow(1, "someone").await,
            Err(TikTokError::NotFollowing(_))
        ));
        svc.unfollow(1, "@creator").await.unwrap();
        assert_eq!(svc.settings(1).await.unwrap().tiktok_user, None);
    }

    #[tokio::test]
    async fn alerts_fire_on_offline_to_live_only() {
        let svc = service();
        svc.follow(1, "creator").await.unwrap();
        svc.set_channel(1, 100).await.unwrap();
        svc.set_role(1, 200).await.unwrap();

        // Offline on first look: nothing.
        assert!(svc.poll_live().await.unwrap().is_empty());

        svc.live_client.live.insert("creator".to_string(), true);
        let alerts = svc.poll_live().await.unwrap();
        assert_eq!(
            alerts,
            vec![LiveAlert {
                guild_id: 1,
                creator: "creator".to_string(),
                channel_id: 100,
                role_id: Some(200),
            }]
        );
        assert_eq!(alerts[0].live_url(), "https://www.tiktok.com/@creator/live");

        // Still live: no repeat.
        assert!(svc.poll_live().await.unwrap().is_empty());

        // Goes offline then live again: alert again.
        svc.live_client.live.insert("creator".to_string(), false);
        assert!(svc.poll_live().await.unwrap().is_empty());
        svc.live_client.live.insert("creator".to_string(), true);
        assert_eq!(svc.poll_live().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn live_at_startup_counts_as_transition() {
        let svc = service();
        svc.follow(1, "creator").await.unwrap();
        svc.set_channel(1, 100).await.unwrap();
        svc.live_client.live.insert("creator".to_string(), true);
        assert_eq!(svc.poll_live().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn guilds_without_channel_get_no_alert() {
        let svc = service();
        svc.follow(1, "creator").await.unwrap();
        svc.follow(2, "creator").await.unwrap();
        svc.set_channel(2, 300).await.unwrap();
        svc.live_client.live.insert("creator".to_string(), true);

        let alerts = svc.poll_live().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].guild_id, 2);
    }

    #[tokio::test]
    async fn failed_checks_keep_previous_state() {
        let svc = service();
        svc.follow(1, "creator").await.unwrap();
        svc.set_channel(1, 100).await.unwrap();
        svc.live_client.live.insert("creator".to_string(), true);
        assert_eq!(svc.poll_live().await.unwrap().len(), 1);

        *svc.live_client.fail.lock().unwrap() = true;
        assert!(svc.poll_live().await.unwrap().is_empty());

        *svc.live_client.fail.lock().unwrap() = false;
        assert!(svc.poll_live().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forgetting_a_guild_clears_everything() {
        let svc = service();
        svc.follow(1, "creator").await.unwrap();
        svc.live_client.live.insert("creator".to_string(), true);
        svc.poll_live().await.unwrap();
        assert!(svc.live_state.contains_key("creator"));

        svc.forget_guild(1).await.unwrap();
        assert_eq!(svc.settings(1).await.unwrap(), TikTokSettings::default());
        assert!(!svc.live_state.contains_key("creator"));
    }

    #[tokio::test]
    async fn auto_download_toggles() {
        let svc = service();
        assert!(svc.toggle_auto_download(1).await.unwrap());
        assert!(!svc.toggle_auto_download(1).await.unwrap());
    }
}
