// Nickname service - keeps member nicknames to a guild's character set.
//
// Pure string policy plus per-guild settings. The Discord layer decides which
// members to look at and applies the resulting `NicknameChange`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discord's own nickname limit.
pub const DISCORD_NICKNAME_LIMIT: u32 = 32;

pub const DEFAULT_ALLOWED_CHARACTERS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

#[derive(Debug, Error)]
pub enum NicknameError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameSettings {
    pub allowed_characters: String,
    pub max_length: u32,
    pub auto_purify: bool,
}

impl Default for NicknameSettings {
    fn default() -> Self {
        Self {
            allowed_characters: DEFAULT_ALLOWED_CHARACTERS.to_string(),
            max_length: DISCORD_NICKNAME_LIMIT,
            auto_purify: false,
        }
    }
}

impl NicknameSettings {
    fn filter(&self, name: &str) -> String {
        name.chars()
            .filter(|c| self.allowed_characters.contains(*c))
            .take(self.max_length as usize)
            .collect()
    }

    /// Allowed characters only, cut to `max_length`; falls back to the
    /// username when nothing of the display name survives.
    pub fn purify(&self, display_name: &str, username: &str) -> String {
        let purified = self.filter(display_name);
        if purified.is_empty() {
            self.filter(username)
        } else {
            purified
        }
    }

    /// Like [`purify`](Self::purify), then title-cased.
    pub fn normalize(&self, display_name: &str, username: &str) -> String {
        title_case(&self.purify(display_name, username))
    }
}

/// Uppercase the first letter of every run of letters, lowercase the rest.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_is_letter = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

/// What to do with a member's nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NicknameChange {
    Set(String),
    /// Remove the nickname so the username shows.
    Clear,
    Unchanged,
}

/// Purify keeps casing; Normalize also title-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicknameStyle {
    Purify,
    Normalize,
}

/// Work out the edit needed to bring a member in line with `settings`.
pub fn plan_change(
    settings: &NicknameSettings,
    style: NicknameStyle,
    display_name: &str,
    username: &str,
    has_nickname: bool,
) -> NicknameChange {
    let target = match style {
        NicknameStyle::Purify => settings.purify(display_name, username),
        NicknameStyle::Normalize => settings.normalize(display_name, username),
    };

    if target == display_name {
        NicknameChange::Unchanged
    } else if target.is_empty() {
        if has_nickname {
            NicknameChange::Clear
        } else {
            NicknameChange::Unchanged
        }
    } else {
        NicknameChange::Set(target)
    }
}

#[async_trait]
pub trait NicknameStore: Send + Sync {
    async fn get_settings(&self, guild_id: u64) -> Result<NicknameSettings, NicknameError>;

    async fn save_settings(
        &self,
        guild_id: u64,
        settings: NicknameSettings,
    ) -> Result<(), NicknameError>;

    /// Guilds that have auto-purify switched on.
    async fn auto_purify_guilds(&self) -> Result<Vec<u64>, NicknameError>;
}

pub struct NicknameService<S: NicknameStore> {
    store: S,
}

impl<S: NicknameStore> NicknameService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn settings(&self, guild_id: u64) -> Result<NicknameSettings, NicknameError> {
        self.store.get_settings(guild_id).await
    }

    /// Plan a change using the guild's settings.
    pub async fn plan(
        &self,
        guild_id: u64,
        style: NicknameStyle,
        display_name: &str,
        username: &str,
        has_nickname: bool,
    ) -> Result<NicknameChange, NicknameError> {
        let settings = self.store.get_settings(guild_id).await?;
        Ok(plan_change(
            &settings,
            style,
            display_name,
            username,
            has_nickname,
        ))
    }

    /// Plan for a member update event. `None` when auto-purify is off.
    pub async fn plan_auto_purify(
        &self,
        guild_id: u64,
        display_name: &str,
        username: &str,
        has_nickname: bool,
    ) -> Result<Option<NicknameChange>, NicknameError> {
        let settings = self.store.get_settings(guild_id).await?;
        if !settings.auto_purify {
            return Ok(None);
        }
        Ok(Some(plan_change(
            &settings,
            NicknameStyle::Purify,
            display_name,
            username,
            has_nickname,
        )))
    }

    pub async fn set_allowed_characters(
        &self,
        guild_id: u64,
        characters: &str,
    ) -> Result<(), NicknameError> {
        if characters.is_empty() {
            return Err(NicknameError::InvalidSetting(
                "At least one character must be allowed.".to_string(),
            ));
        }
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.allowed_characters = characters.to_string();
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn set_max_length(&self, guild_id: u64, length: i64) -> Result<(), NicknameError> {
        if !(1..=DISCORD_NICKNAME_LIMIT as i64).contains(&length) {
            return Err(NicknameError::InvalidSetting(format!(
                "The maximum length must be between 1 and {DISCORD_NICKNAME_LIMIT}."
            )));
        }
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.max_length = length as u32;
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn set_auto_purify(&self, guild_id: u64, enabled: bool) -> Result<(), NicknameError> {
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.auto_purify = enabled;
        self.store.save_settings(guild_id, settings).await
    }

    pub async fn auto_purify_guilds(&self) -> Result<Vec<u64>, NicknameError> {
        self.store.auto_purify_guilds().await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    #[derive(Default)]
    struct MockNicknameStore {
        settings: DashMap<u64, NicknameSettings>,
    }

    #[async_trait]
    impl NicknameStore for MockNicknameStore {
        async fn get_settings(&self, guild_id: u64) -> Result<NicknameSettings, NicknameError> {
            Ok(self
                .settings
                .get(&guild_id)
                .map(|s| s.clone())
                .unwrap_or_default())
        }

        async fn save_settings(
            &self,
            guild_id: u64,
            settings: NicknameSettings,
        ) -> Result<(), NicknameError> {
            self.settings.insert(guild_id, settings);
            Ok(())
        }

        async fn auto_purify_guilds(&self) -> Result<Vec<u64>, NicknameError> {
            Ok(self
                .settings
                .iter()
                .filter(|entry| entry.auto_purify)
                .map(|entry| *entry.key())
                .collect())
        }
    }

    #[test]
    fn purify_strips_disallowed_characters() {
        let settings = NicknameSettings::default();
        assert_eq!(settings.purify("✨ Cool_Guy ✨", "coolguy"), " CoolGuy ");
    }

    #[test]
    fn purify_falls_back_to_username() {
        let settings = NicknameSettings::default();
        assert_eq!(settings.purify("★彡☆", "fallback99"), "fallback99");
    }

    #[test]
    fn purify_truncates_by_characters() {
        let settings = NicknameSettings {
            max_length: 5,
            ..Default::default()
        };
        assert_eq!(settings.purify("abcdefgh", "x"), "abcde");
    }

    #[test]
    fn normalize_title_cases_words() {
        let settings = NicknameSettings::default();
        assert_eq!(settings.normalize("jOHN sMITH!!", "john"), "John Smith");
        assert_eq!(title_case("agent47x"), "Agent47X");
    }

    #[test]
    fn plan_change_cases() {
        let settings = NicknameSettings::default();
        assert_eq!(
            plan_change(&settings, NicknameStyle::Purify, "Alice", "alice", true),
            NicknameChange::Unchanged
        );
        assert_eq!(
            plan_change(&settings, NicknameStyle::Purify, "Al!ce", "alice", true),
            NicknameChange::Set("Alce".to_string())
        );
        assert_eq!(
            plan_change(&settings, NicknameStyle::Purify, "★", "☆", true),
            NicknameChange::Clear
        );
        assert_eq!(
            plan_change(&settings, NicknameStyle::Purify, "★", "☆", false),
            NicknameChange::Unchanged
        );
    }

    #[tokio::test]
    async fn max_length_is_bounded() {
        let service = NicknameService::new(MockNicknameStore::default());
        assert!(service.set_max_length(1, 0).await.is_err());
        assert!(service.set_max_length(1, 33).await.is_err());
        service.set_max_length(1, 10).await.unwrap();
        assert_eq!(service.settings(1).await.unwrap().max_length, 10);
    }

    #[tokio::test]
    async fn auto_purify_only_when_enabled() {
        let service = NicknameService::new(MockNicknameStore::default());
        assert_eq!(
            service.plan_auto_purify(1, "B@d", "bad", true).await.unwrap(),
            None
        );

        service.set_auto_purify(1, true).await.unwrap();
        assert_eq!(
            service.plan_auto_purify(1, "B@d", "bad", true).await.unwrap(),
            Some(NicknameChange::Set("Bd".to_string()))
        );
        assert_eq!(service.auto_purify_guilds().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn allowed_characters_cannot_be_empty() {
        let service = NicknameService::new(MockNicknameStore::default());
        assert!(service.set_allowed_characters(1, "").await.is_err());
        service.set_allowed_characters(1, "abc").await.unwrap();
        assert_eq!(service.settings(1).await.unwrap().allowed_characters, "abc");
    }
}
