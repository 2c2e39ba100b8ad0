// SQLite-backed URL scanner opt-in flags.

use crate::core::cloudflare::{AutoscanStore, CloudflareError};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteAutoscanStore {
    pool: Pool<Sqlite>,
}

impl SqliteAutoscanStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), CloudflareError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urlscan_autoscan (
                guild_id INTEGER PRIMARY KEY,
                enabled INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CloudflareError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AutoscanStore for SqliteAutoscanStore {
    async fn is_enabled(&self, guild_id: u64) -> Result<bool, CloudflareError> {
        let row = sqlx::query("SELECT enabled FROM urlscan_autoscan WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CloudflareError::StorageError(e.to_string()))?;

        Ok(row.map(|r| r.get::<bool, _>("enabled")).unwrap_or(false))
    }

    async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), CloudflareError> {
        sqlx::query(
            r#"
            INSERT INTO urlscan_autoscan (guild_id, enabled)
            VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET enabled = excluded.enabled
            "#,
        )
        .bind(guild_id as i64)
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_err(|e| CloudflareError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn flags_default_off_and_toggle() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteAutoscanStore::new(pool);
        store.migrate().await.unwrap();

        assert!(!store.is_enabled(5).await.unwrap());
        store.set_enabled(5, true).await.unwrap();
        assert!(store.is_enabled(5).await.unwrap());
        store.set_enabled(5, false).await.unwrap();
        assert!(!store.is_enabled(5).await.unwrap());
    }
}
