// SQLite-backed nickname settings.

use crate::core::nicknames::{NicknameError, NicknameSettings, NicknameStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteNicknameStore {
    pool: Pool<Sqlite>,
}

impl SqliteNicknameStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), NicknameError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nickname_settings (
                guild_id INTEGER PRIMARY KEY,
                allowed_characters TEXT NOT NULL,
                max_length INTEGER NOT NULL DEFAULT 32,
                auto_purify INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| NicknameError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NicknameStore for SqliteNicknameStore {
    async fn get_settings(&self, guild_id: u64) -> Result<NicknameSettings, NicknameError> {
        let row = sqlx::query("SELECT * FROM nickname_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NicknameError::StorageError(e.to_string()))?;

        Ok(row
            .map(|row| NicknameSettings {
                allowed_characters: row.get("allowed_characters"),
                max_length: row.get::<i64, _>("max_length").clamp(1, 32) as u32,
                auto_purify: row.get("auto_purify"),
            })
            .unwrap_or_default())
    }

    async fn save_settings(
        &self,
        guild_id: u64,
        settings: NicknameSettings,
    ) -> Result<(), NicknameError> {
        sqlx::query(
            r#"
            INSERT INTO nickname_settings (guild_id, allowed_characters, max_length, auto_purify)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                allowed_characters = excluded.allowed_characters,
                max_length = excluded.max_length,
                auto_purify = excluded.auto_purify
            "#,
        )
        .bind(guild_id as i64)
        .bind(&settings.allowed_characters)
        .bind(settings.max_length as i64)
        .bind(settings.auto_purify)
        .execute(&self.pool)
        .await
        .map_err(|e| NicknameError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn auto_purify_guilds(&self) -> Result<Vec<u64>, NicknameError> {
        let rows = sqlx::query("SELECT guild_id FROM nickname_settings WHERE auto_purify = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NicknameError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| row.get::<i64, _>("guild_id") as u64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteNicknameStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteNicknameStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn unknown_guild_gets_defaults() {
        let store = store().await;
        assert_eq!(store.get_settings(1).await.unwrap(), NicknameSettings::default());
    }

    #[tokio::test]
    async fn only_auto_purify_guilds_are_listed() {
        let store = store().await;
        let on = NicknameSettings {
            auto_purify: true,
            max_length: 12,
            ..Default::default()
        };
        store.save_settings(1, on.clone()).await.unwrap();
        store.save_settings(2, NicknameSettings::default()).await.unwrap();

        assert_eq!(store.get_settings(1).await.unwrap(), on);
        assert_eq!(store.auto_purify_guilds().await.unwrap(), vec![1]);
    }
}
