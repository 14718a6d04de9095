use crate::auth;
use crate::db::KeyStore;
use crate::error::Result;

/// Create a key for the given owner and print the secret once
pub async fn create_key(store: &KeyStore, email: &str, name: Option<String>) -> Result<()> {
    let user = store.get_or_create_user(email, None, None).await?;
    let name = name.unwrap_or_else(auth::default_key_name);
    let record = store
        .create_key(user.id, &name, &auth::generate_key())
        .await?;

    println!("Created API key for {email}:");
    println!("  id:   {}", record.id);
    println!("  name: {}", record.name);
    println!("  key:  {}", record.key);
    Ok(())
}

/// Zero out a key's usage counter
pub async fn reset_usage(store: &KeyStore, id: i64) -> Result<()> {
    if store.reset_usage(id).await? {
        println!("Usage reset for key {id}");
    } else {
        println!("No key with id {id}");
    }
    Ok(())
}

/// List a user's keys with usage counters
pub async fn list_keys(store: &KeyStore, email: &str, limit: i64) -> Result<()> {
    let user = store.get_or_create_user(email, None, None).await?;
    let keys = store.list_by_owner(user.id).await?;

    if keys.is_empty() {
        println!("No API keys for {email}");
        return Ok(());
    }

    println!("API keys for {email}:");
    for key in keys {
        println!(
            "  [{}] {} - usage {}/{} (created {})",
            key.id,
            key.name,
            key.usage,
            limit,
            key.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
