pub mod api_keys;
pub mod models;
pub mod users;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use models::{ApiKey, User};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

/// Initialize database connection pool
pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    // Create data directory if it doesn't exist (for SQLite)
    if database_url.starts_with("sqlite:") {
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if let Some(parent) = Path::new(path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let pool = SqlitePool::connect(database_url).await?;
    Ok(pool)
}

/// Initialize database connection pool with custom configuration
pub async fn init_pool_with_config(config: &DatabaseConfig) -> Result<DbPool> {
    let url = config
        .url
        .as_deref()
        .ok_or(Error::StoreUnconfigured)?;

    // Create data directory if it doesn't exist (for SQLite)
    if url.starts_with("sqlite:") {
        if let Some(path) = url.strip_prefix("sqlite:") {
            if let Some(parent) = Path::new(path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect(url)
        .await?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// The key store as an explicit tagged state: either backed by a live pool
/// or unconfigured (no DATABASE_URL at startup). Every operation on the
/// unconfigured variant returns `Error::StoreUnconfigured`, which surfaces
/// to clients as 503 rather than an auth failure.
#[derive(Clone)]
pub enum KeyStore {
    Live(DbPool),
    Unconfigured,
}

impl KeyStore {
    /// Build the store from configuration, connecting when a URL is present
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_none() {
            return Ok(KeyStore::Unconfigured);
        }
        let pool = init_pool_with_config(config).await?;
        Ok(KeyStore::Live(pool))
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, KeyStore::Live(_))
    }

    fn pool(&self) -> Result<&DbPool> {
        match self {
            KeyStore::Live(pool) => Ok(pool),
            KeyStore::Unconfigured => Err(Error::StoreUnconfigured),
        }
    }

    /// Apply pending migrations on the live pool
    pub async fn migrate(&self) -> Result<()> {
        run_migrations(self.pool()?).await
    }

    /// Liveness probe against the backing database
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()?).await?;
        Ok(())
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>> {
        api_keys::find_by_key(self.pool()?, key).await
    }

    pub async fn get_key(&self, id: i64) -> Result<Option<ApiKey>> {
        api_keys::get_key(self.pool()?, id).await
    }

    pub async fn increment_usage(&self, id: i64) -> Result<bool> {
        api_keys::increment_usage(self.pool()?, id).await
    }

    pub async fn reset_usage(&self, id: i64) -> Result<bool> {
        api_keys::reset_usage(self.pool()?, id).await
    }

    pub async fn create_key(&self, user_id: i64, name: &str, key: &str) -> Result<ApiKey> {
        api_keys::create_key(self.pool()?, user_id, name, key).await
    }

    pub async fn rename_key(&self, id: i64, name: &str) -> Result<Option<ApiKey>> {
        api_keys::rename_key(self.pool()?, id, name).await
    }

    pub async fn delete_key(&self, id: i64) -> Result<bool> {
        api_keys::delete_key(self.pool()?, id).await
    }

    pub async fn list_by_owner(&self, user_id: i64) -> Result<Vec<ApiKey>> {
        api_keys::list_by_owner(self.pool()?, user_id).await
    }

    pub async fn get_or_create_user(
        &self,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<User> {
        users::get_or_create_by_email(self.pool()?, email, name, image).await
    }

    /// Usage stats for dashboard display. Read failures degrade to a
    /// neutral default instead of blocking the page (fail-open for
    /// display-only reads, unlike authorization which fails closed).
    pub async fn usage_stats(&self, id: i64, limit: i64) -> models::UsageStats {
        match self.get_key(id).await {
            Ok(Some(record)) => models::UsageStats::new(record.usage, limit),
            Ok(None) => models::UsageStats::new(0, limit),
            Err(e) => {
                tracing::warn!("Failed to read usage stats: {}", e.log_safe());
                models::UsageStats::new(0, limit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_init_pool() {
        let pool = init_pool("sqlite::memory:").await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_store_reports_unconfigured() {
        let store = KeyStore::Unconfigured;
        assert!(!store.is_configured());

        let err = store.find_by_key("blingo-whatever").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnconfigured));

        let err = store.increment_usage(1).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnconfigured));
    }

    #[tokio::test]
    async fn test_key_crud_round_trip() {
        let store = KeyStore::Live(test_pool().await);

        let user = store
            .get_or_create_user("jo@example.com", Some("Jo"), None)
            .await
            .unwrap();

        let created = store
            .create_key(user.id, "default", "blingo-abc123")
            .await
            .unwrap();
        assert_eq!(created.usage, 0);

        let found = store.find_by_key("blingo-abc123").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_key("blingo-nope").await.unwrap().is_none());

        let renamed = store.rename_key(created.id, "prod").await.unwrap().unwrap();
        assert_eq!(renamed.name, "prod");

        assert!(store.delete_key(created.id).await.unwrap());
        assert!(!store.delete_key(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_and_reset_usage() {
        let store = KeyStore::Live(test_pool().await);
        let user = store
            .get_or_create_user("jo@example.com", None, None)
            .await
            .unwrap();
        let key = store.create_key(user.id, "k", "blingo-x").await.unwrap();

        for _ in 0..3 {
            assert!(store.increment_usage(key.id).await.unwrap());
        }
        let record = store.get_key(key.id).await.unwrap().unwrap();
        assert_eq!(record.usage, 3);

        assert!(store.reset_usage(key.id).await.unwrap());
        let record = store.get_key(key.id).await.unwrap().unwrap();
        assert_eq!(record.usage, 0);

        // Incrementing a deleted key reports false, not an error
        store.delete_key(key.id).await.unwrap();
        assert!(!store.increment_usage(key.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let store = KeyStore::Live(test_pool().await);
        let user = store
            .get_or_create_user("jo@example.com", None, None)
            .await
            .unwrap();

        store.create_key(user.id, "first", "blingo-1").await.unwrap();
        store.create_key(user.id, "second", "blingo-2").await.unwrap();

        let keys = store.list_by_owner(user.id).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].name, "second");
        assert_eq!(keys[1].name, "first");
    }

    #[tokio::test]
    async fn test_usage_stats_degrades_on_missing_key() {
        let store = KeyStore::Live(test_pool().await);
        let stats = store.usage_stats(9999, 1000).await;
        assert_eq!(stats.usage, 0);
        assert_eq!(stats.remaining, 1000);
    }
}
