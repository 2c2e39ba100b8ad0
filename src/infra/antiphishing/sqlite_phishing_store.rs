// SQLite-backed anti-phishing store.
//
// Tables:
// - phishing_settings: Per-guild action, link limit, log channel and mod role
// - phishing_stats: Per-guild lifetime counters
// - phishing_members: How many malicious links each member has posted

use crate::core::antiphishing::{
    GuildPhishingSettings, PhishingAction, PhishingCounter, PhishingError, PhishingStats,
    PhishingStore,
};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqlitePhishingStore {
    pool: Pool<Sqlite>,
}

impl SqlitePhishingStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), PhishingError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS phishing_settings (
                guild_id INTEGER PRIMARY KEY,
                action TEXT NOT NULL DEFAULT 'notify',
                max_links INTEGER NOT NULL DEFAULT 3,
                log_channel_id INTEGER,
                mod_role_id INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS phishing_stats (
                guild_id INTEGER PRIMARY KEY,
                caught INTEGER NOT NULL DEFAULT 0,
                notifications INTEGER NOT NULL DEFAULT 0,
                deletions INTEGER NOT NULL DEFAULT 0,
                kicks INTEGER NOT NULL DEFAULT 0,
                bans INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS phishing_members (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                caught INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        Ok(())
    }
}

fn counter_column(counter: PhishingCounter) -> &'static str {
    match counter {
        PhishingCounter::Caught => "caught",
        PhishingCounter::Notifications => "notifications",
        PhishingCounter::Deletions => "deletions",
        PhishingCounter::Kicks => "kicks",
        PhishingCounter::Bans => "bans",
    }
}

#[async_trait]
impl PhishingStore for SqlitePhishingStore {
    async fn get_settings(&self, guild_id: u64) -> Result<GuildPhishingSettings, PhishingError> {
        let row = sqlx::query("SELECT * FROM phishing_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(GuildPhishingSettings::default());
        };

        let action_str: String = row.get("action");
        let action = action_str.parse::<PhishingAction>().unwrap_or_else(|err| {
            tracing::warn!(guild_id, error = %err, "Unknown stored phishing action, using default");
            PhishingAction::default()
        });

        Ok(GuildPhishingSettings {
            action,
            max_links: row.get::<i64, _>("max_links").max(1) as u32,
            log_channel_id: row
                .get::<Option<i64>, _>("log_channel_id")
                .map(|id| id as u64),
            mod_role_id: row.get::<Option<i64>, _>("mod_role_id").map(|id| id as u64),
        })
    }

    async fn save_settings(
        &self,
        guild_id: u64,
        settings: GuildPhishingSettings,
    ) -> Result<(), PhishingError> {
        sqlx::query(
            r#"
            INSERT INTO phishing_settings (guild_id, action, max_links, log_channel_id, mod_role_id)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                action = excluded.action,
                max_links = excluded.max_links,
                log_channel_id = excluded.log_channel_id,
                mod_role_id = excluded.mod_role_id
            "#,
        )
        .bind(guild_id as i64)
        .bind(settings.action.as_str())
        .bind(settings.max_links as i64)
        .bind(settings.log_channel_id.map(|id| id as i64))
        .bind(settings.mod_role_id.map(|id| id as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| PhishingError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn get_stats(&self, guild_id: u64) -> Result<PhishingStats, PhishingError> {
        let row = sqlx::query("SELECT * FROM phishing_stats WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        Ok(row
            .map(|row| PhishingStats {
                caught: row.get::<i64, _>("caught") as u64,
                notifications: row.get::<i64, _>("notifications") as u64,
                deletions: row.get::<i64, _>("deletions") as u64,
                kicks: row.get::<i64, _>("kicks") as u64,
                bans: row.get::<i64, _>("bans") as u64,
            })
            .unwrap_or_default())
    }

    async fn increment_counter(
        &self,
        guild_id: u64,
        counter: PhishingCounter,
    ) -> Result<(), PhishingError> {
        // Column names come from a fixed match, never from user input.
        let column = counter_column(counter);
        let sql = format!(
            "INSERT INTO phishing_stats (guild_id, {column}) VALUES (?, 1) \
             ON CONFLICT(guild_id) DO UPDATE SET {column} = {column} + 1"
        );
        sqlx::query(&sql)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| PhishingError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn increment_member_caught(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<u32, PhishingError> {
        sqlx::query(
            r#"
            INSERT INTO phishing_members (guild_id, user_id, caught)
            VALUES (?, ?, 1)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
                caught = caught + 1
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        self.get_member_caught(guild_id, user_id).await
    }

    async fn get_member_caught(&self, guild_id: u64, user_id: u64) -> Result<u32, PhishingError> {
        let row =
            sqlx::query("SELECT caught FROM phishing_members WHERE guild_id = ? AND user_id = ?")
                .bind(guild_id as i64)
                .bind(user_id as i64)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PhishingError::StorageError(e.to_string()))?;

        Ok(row.map(|r| r.get::<i64, _>("caught") as u32).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqlitePhishingStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqlitePhishingStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn missing_rows_read_as_defaults() {
        let store = store().await;
        assert_eq!(
            store.get_settings(1).await.unwrap(),
            GuildPhishingSettings::default()
        );
        assert_eq!(store.get_stats(1).await.unwrap(), PhishingStats::default());
        assert_eq!(store.get_member_caught(1, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn settings_round_trip_and_overwrite() {
        let store = store().await;
        let settings = GuildPhishingSettings {
            action: PhishingAction::Kick,
            max_links: 5,
            log_channel_id: Some(42),
            mod_role_id: None,
        };
        store.save_settings(1, settings.clone()).await.unwrap();
        assert_eq!(store.get_settings(1).await.unwrap(), settings);

        let cleared = GuildPhishingSettings {
            log_channel_id: None,
            ..settings
        };
        store.save_settings(1, cleared.clone()).await.unwrap();
        assert_eq!(store.get_settings(1).await.unwrap(), cleared);
    }

    #[tokio::test]
    async fn counters_accumulate_independently() {
        let store = store().await;
        store.increment_counter(1, PhishingCounter::Caught).await.unwrap();
        store.increment_counter(1, PhishingCounter::Caught).await.unwrap();
        store.increment_counter(1, PhishingCounter::Bans).await.unwrap();
        store.increment_counter(2, PhishingCounter::Kicks).await.unwrap();

        let stats = store.get_stats(1).await.unwrap();
        assert_eq!(stats.caught, 2);
        assert_eq!(stats.bans, 1);
        assert_eq!(stats.kicks, 0);
        assert_eq!(store.get_stats(2).await.unwrap().kicks, 1);
    }

    #[tokio::test]
    async fn member_counter_returns_new_value() {
        let store = store().await;
        assert_eq!(store.increment_member_caught(1, 7).await.unwrap(), 1);
        assert_eq!(store.increment_member_caught(1, 7).await.unwrap(), 2);
        assert_eq!(store.increment_member_caught(2, 7).await.unwrap(), 1);
    }
}
