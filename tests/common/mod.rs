#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use blingo::api::handlers::AppState;
use blingo::api::routes::create_router;
use blingo::auth::Authenticator;
use blingo::config::{
    DatabaseConfig, GitHubSettings, QuotaConfig, ServerConfig, Settings, SummarizerSettings,
};
use blingo::db::{models::ApiKey, run_migrations, KeyStore};
use blingo::github::GitHubClient;
use blingo::summarizer::Summarizer;
use sqlx::sqlite::SqlitePoolOptions;

/// Settings with external hosts pointed nowhere useful; tests override the
/// base URLs with their mockito servers
pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 1,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_rate_limit: 100,
            max_request_body_size: 1048576,
        },
        quota: QuotaConfig {
            usage_limit: 1000,
            dev_bypass: false,
        },
        github: GitHubSettings {
            token: None,
            api_base_url: "http://127.0.0.1:9".to_string(),
            raw_base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 5,
        },
        summarizer: SummarizerSettings {
            api_key: None,
            api_base_url: "http://127.0.0.1:9".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        },
    }
}

/// Fresh in-memory store with migrations applied
pub async fn live_store() -> KeyStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    KeyStore::Live(pool)
}

/// Seed a user + key with a given starting usage
pub async fn seed_key(store: &KeyStore, email: &str, key: &str, usage: i64) -> ApiKey {
    let user = store.get_or_create_user(email, None, None).await.unwrap();
    let record = store.create_key(user.id, "test key", key).await.unwrap();
    for _ in 0..usage {
        store.increment_usage(record.id).await.unwrap();
    }
    store.get_key(record.id).await.unwrap().unwrap()
}

/// Assemble the full router over the given store and settings
pub fn make_app(store: KeyStore, settings: &Settings) -> Router {
    let authenticator = Authenticator::new(
        store.clone(),
        settings.quota.usage_limit,
        settings.quota.dev_bypass,
    );
    let github = GitHubClient::new(&settings.github).unwrap();
    let summarizer = Summarizer::new(settings.summarizer.clone()).unwrap();

    let state = AppState {
        store,
        authenticator,
        github,
        summarizer,
        settings: settings.clone(),
    };

    create_router(state, settings)
}

pub fn post_summarize(key: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/github-summarizer")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
