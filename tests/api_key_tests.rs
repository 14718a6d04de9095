mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::json;
use tower::ServiceExt;

fn key_request(method: &str, uri: &str, email: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(email) = email {
        builder = builder.header("x-user-email", email);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn create_and_list_keys() {
    let store = live_store().await;
    let settings = test_settings();

    let app = make_app(store.clone(), &settings);
    let response = app
        .clone()
        .oneshot(key_request(
            "POST",
            "/api/api-keys",
            Some("jo@example.com"),
            Some(json!({ "name": "ci key" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "ci key");
    assert_eq!(body["data"]["usage"], 0);
    let key = body["data"]["key"].as_str().unwrap();
    assert!(key.starts_with("blingo-"));
    assert_eq!(key.len(), "blingo-".len() + 32);

    // Second key; list comes back newest first
    let response = app
        .clone()
        .oneshot(key_request(
            "POST",
            "/api/api-keys",
            Some("jo@example.com"),
            Some(json!({ "name": "newer key" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(key_request("GET", "/api/api-keys", Some("jo@example.com"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["name"], "newer key");
    assert_eq!(data[1]["name"], "ci key");
}

#[tokio::test]
async fn create_without_name_gets_a_default() {
    let store = live_store().await;
    let app = make_app(store, &test_settings());

    let response = app
        .oneshot(key_request(
            "POST",
            "/api/api-keys",
            Some("jo@example.com"),
            Some(json!({})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["data"]["name"].as_str().unwrap().starts_with("API Key "));
}

#[tokio::test]
async fn missing_identity_is_401() {
    let store = live_store().await;
    let app = make_app(store, &test_settings());

    let response = app
        .oneshot(key_request("GET", "/api/api-keys", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unconfigured_store_is_503_for_crud() {
    let app = make_app(blingo::db::KeyStore::Unconfigured, &test_settings());

    let response = app
        .oneshot(key_request("GET", "/api/api-keys", Some("jo@example.com"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn rename_and_delete_own_key() {
    let store = live_store().await;
    let record = seed_key(&store, "jo@example.com", "blingo-mine", 0).await;
    let app = make_app(store.clone(), &test_settings());

    let response = app
        .clone()
        .oneshot(key_request(
            "PATCH",
            &format!("/api/api-keys/{}", record.id),
            Some("jo@example.com"),
            Some(json!({ "name": "renamed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "renamed");

    let response = app
        .oneshot(key_request(
            "DELETE",
            &format!("/api/api-keys/{}", record.id),
            Some("jo@example.com"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.get_key(record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn cannot_touch_another_users_key() {
    let store = live_store().await;
    let record = seed_key(&store, "owner@example.com", "blingo-owned", 0).await;
    let app = make_app(store.clone(), &test_settings());

    let response = app
        .oneshot(key_request(
            "DELETE",
            &format!("/api/api-keys/{}", record.id),
            Some("intruder@example.com"),
            None,
        ))
        .await
        .unwrap();

    // Not found rather than forbidden: existence is not leaked
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(store.get_key(record.id).await.unwrap().is_some());
}

#[tokio::test]
async fn usage_stats_endpoint_reports_remaining() {
    let store = live_store().await;
    let record = seed_key(&store, "jo@example.com", "blingo-stats", 250).await;
    let app = make_app(store, &test_settings());

    let response = app
        .oneshot(key_request(
            "GET",
            &format!("/api/api-keys/{}/usage", record.id),
            Some("jo@example.com"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["usage"], 250);
    assert_eq!(body["limit"], 1000);
    assert_eq!(body["remaining"], 750);
    assert_eq!(body["percent_used"], 25);
}

// N concurrent charges on one key land at exactly +N
#[tokio::test]
async fn concurrent_increments_lose_no_updates() {
    let store = live_store().await;
    let record = seed_key(&store, "jo@example.com", "blingo-busy", 0).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        let id = record.id;
        handles.push(tokio::spawn(async move {
            store.increment_usage(id).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let after = store.get_key(record.id).await.unwrap().unwrap();
    assert_eq!(after.usage, 20);
}
