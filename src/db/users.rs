use crate::db::{models::User, DbPool};
use crate::error::Result;
use chrono::Utc;

/// Get a user by email, creating the row on first sight.
///
/// The email/name/image triple comes from the external identity provider
/// and is treated as opaque here.
pub async fn get_or_create_by_email(
    pool: &DbPool,
    email: &str,
    name: Option<&str>,
    image: Option<&str>,
) -> Result<User> {
    if let Some(user) = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?
    {
        return Ok(user);
    }

    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, image, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(image)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(user)
}
