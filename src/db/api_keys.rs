use crate::db::{models::ApiKey, DbPool};
use crate::error::Result;
use chrono::Utc;

/// Find an API key record by its exact secret token
pub async fn find_by_key(pool: &DbPool, key: &str) -> Result<Option<ApiKey>> {
    let record = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Get an API key record by ID
pub async fn get_key(pool: &DbPool, id: i64) -> Result<Option<ApiKey>> {
    let record = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Atomically increment the usage counter for a key.
///
/// The single-statement UPDATE is the atomic path: concurrent charges on the
/// same key cannot lose updates. Returns false when the key no longer exists.
pub async fn increment_usage(pool: &DbPool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE api_keys SET usage = usage + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Reset usage for a key (e.g. for a monthly reset)
pub async fn reset_usage(pool: &DbPool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE api_keys SET usage = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Create a new API key record; usage always starts at zero
pub async fn create_key(pool: &DbPool, user_id: i64, name: &str, key: &str) -> Result<ApiKey> {
    let now = Utc::now();

    let record = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (user_id, name, key, usage, created_at)
        VALUES (?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(key)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Rename an existing key
pub async fn rename_key(pool: &DbPool, id: i64, name: &str) -> Result<Option<ApiKey>> {
    let record = sqlx::query_as::<_, ApiKey>(
        "UPDATE api_keys SET name = ? WHERE id = ? RETURNING *",
    )
    .bind(name)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Delete a key
pub async fn delete_key(pool: &DbPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM api_keys WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List all keys for a user, newest first
pub async fn list_by_owner(pool: &DbPool, user_id: i64) -> Result<Vec<ApiKey>> {
    let records = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
