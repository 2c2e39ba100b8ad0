// SQLite-backed TikTok guild settings.

use crate::core::tiktok::{TikTokError, TikTokSettings, TikTokStore};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTikTokStore {
    pool: Pool<Sqlite>,
}

impl SqliteTikTokStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), TikTokError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tiktok_settings (
                guild_id INTEGER PRIMARY KEY,
                tiktok_user TEXT,
                alert_channel_id INTEGER,
                alert_role_id INTEGER,
                auto_download INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TikTokError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn settings_from_row(row: &SqliteRow) -> TikTokSettings {
    TikTokSettings {
        tiktok_user: row.get("tiktok_user"),
        alert_channel_id: row
            .get::<Option<i64>, _>("alert_channel_id")
            .map(|id| id as u64),
        alert_role_id: row.get::<Option<i64>, _>("alert_role_id").map(|id| id as u64),
        auto_download: row.get("auto_download"),
    }
}

#[async_trait]
impl TikTokStore for SqliteTikTokStore {
    async fn get_settings(&self, guild_id: u64) -> Result<TikTokSettings, TikTokError> {
        let row = sqlx::query("SELECT * FROM tiktok_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TikTokError::StorageError(e.to_string()))?;

        Ok(row.as_ref().map(settings_from_row).unwrap_or_default())
    }

    async fn save_settings(
        &self,
        guild_id: u64,
        settings: TikTokSettings,
    ) -> Result<(), TikTokError> {
        sqlx::query(
            r#"
            INSERT INTO tiktok_settings (guild_id, tiktok_user, alert_channel_id, alert_role_id, auto_download)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                tiktok_user = excluded.tiktok_user,
                alert_channel_id = excluded.alert_channel_id,
                alert_role_id = excluded.alert_role_id,
                auto_download = excluded.auto_download
            "#,
        )
        .bind(guild_id as i64)
        .bind(settings.tiktok_user.as_deref())
        .bind(settings.alert_channel_id.map(|id| id as i64))
        .bind(settings.alert_role_id.map(|id| id as i64))
        .bind(settings.auto_download)
        .execute(&self.pool)
        .await
        .map_err(|e| TikTokError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn followed(&self) -> Result<Vec<(u64, TikTokSettings)>, TikTokError> {
        let rows = sqlx::query("SELECT * FROM tiktok_settings WHERE tiktok_user IS NOT NULL")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TikTokError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<i64, _>("guild_id") as u64, settings_from_row(row)))
            .collect())
    }

    async fn delete_guild(&self, guild_id: u64) -> Result<(), TikTokError> {
        sqlx::query("DELETE FROM tiktok_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| TikTokError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteTikTokStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteTikTokStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn followed_lists_only_guilds_with_a_creator() {
        let store = store().await;
        let following = TikTokSettings {
            tiktok_user: Some("bee".to_string()),
            alert_channel_id: Some(10),
            alert_role_id: None,
            auto_download: true,
        };
        store.save_settings(1, following.clone()).await.unwrap();
        store
            .save_settings(
                2,
                TikTokSettings {
                    auto_download: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.followed().await.unwrap(), vec![(1, following)]);
    }

    #[tokio::test]
    async fn deleted_guild_reads_as_default() {
        let store = store().await;
        store
            .save_settings(
                3,
                TikTokSettings {
                    tiktok_user: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.delete_guild(3).await.unwrap();
        assert_eq!(store.get_settings(3).await.unwrap(), TikTokSettings::default());
    }
}
