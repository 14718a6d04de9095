use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A dashboard user, keyed by the email supplied by the external
/// identity provider
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An API key record. `usage` is charged through the atomic increment
/// in [`crate::db::api_keys::increment_usage`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub key: String,
    pub usage: i64,
    pub created_at: DateTime<Utc>,
}

/// Usage statistics for a single key, for dashboard display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub usage: i64,
    pub limit: i64,
    pub remaining: i64,
    pub percent_used: i64,
}

impl UsageStats {
    pub fn new(usage: i64, limit: i64) -> Self {
        Self {
            usage,
            limit,
            remaining: (limit - usage).max(0),
            percent_used: if limit > 0 {
                (usage * 100 + limit / 2) / limit
            } else {
                0
            },
        }
    }
}
