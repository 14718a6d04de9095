use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::models::*;
use crate::auth::{self, AuthOutcome, Authenticator};
use crate::db::{models::ApiKey, KeyStore};
use crate::github::{self, GitHubClient, ReadmeResult, ReleaseInfo, RepoInfo};
use crate::summarizer::{Summarizer, SummaryOutcome};
use crate::{Error, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: KeyStore,
    pub authenticator: Authenticator,
    pub github: GitHubClient,
    pub summarizer: Summarizer,
    pub settings: crate::config::Settings,
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

/// OPTIONS /api/github-summarizer - CORS preflight
pub async fn summarizer_preflight() -> StatusCode {
    StatusCode::OK
}

/// GET /api/github-summarizer - status probe under the same auth rules
pub async fn summarizer_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let api_key = auth::extract_api_key(&headers);
    let limit = state.authenticator.usage_limit();

    match state.authenticator.authorize(api_key.as_deref()).await {
        AuthOutcome::Bypass => Json(StatusResponse {
            success: true,
            message: "GitHub Summarizer API is ready (DEV MODE).".to_string(),
            usage: 0,
            limit,
            remaining: limit,
        })
        .into_response(),
        AuthOutcome::Valid(record) => Json(StatusResponse {
            success: true,
            message: "GitHub Summarizer API is ready. Use POST with a githubUrl in the body."
                .to_string(),
            usage: record.usage,
            limit,
            remaining: limit - record.usage,
        })
        .into_response(),
        AuthOutcome::RateLimited { record, reason } => json_response(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": reason, "usage": record.usage, "limit": limit }),
        ),
        AuthOutcome::Invalid(reason) => {
            json_response(StatusCode::UNAUTHORIZED, json!({ "error": reason }))
        }
        AuthOutcome::StoreUnconfigured => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "error": "Database not configured" }),
        ),
    }
}

/// POST /api/github-summarizer - the summarization pipeline.
///
/// Authorization and input failures are terminal with real HTTP error
/// codes; everything downstream of step 3 degrades into one coherent
/// 200 body instead of aborting.
pub async fn summarize_repo(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Response {
    let limit = state.authenticator.usage_limit();

    // Step 1-2: extract key and authorize. The validated snapshot is
    // threaded explicitly from here to the charge step.
    let api_key = auth::extract_api_key(&headers);
    let key_data: Option<ApiKey> = match state.authenticator.authorize(api_key.as_deref()).await {
        AuthOutcome::Valid(record) => Some(record),
        AuthOutcome::Bypass => None,
        AuthOutcome::RateLimited { record, reason } => {
            return json_response(
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": reason, "usage": record.usage, "limit": limit }),
            );
        }
        AuthOutcome::Invalid(reason) => {
            return json_response(StatusCode::UNAUTHORIZED, json!({ "error": reason }));
        }
        AuthOutcome::StoreUnconfigured => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Database not configured" }),
            );
        }
    };

    // Step 3: parse and validate the body, before any network I/O
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(_) => {
            return json_response(StatusCode::BAD_REQUEST, json!({ "error": "Invalid JSON body" }));
        }
    };

    let github_url = request.github_url.filter(|s| !s.is_empty());
    let provided_readme = request.readme_content.filter(|s| !s.is_empty());

    if github_url.is_none() && provided_readme.is_none() {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Either githubUrl or readmeContent is required" }),
        );
    }

    if let Some(url) = &github_url {
        let shape = Regex::new(r"^https://github\.com/[^/]+/[^/]+").unwrap();
        if !shape.is_match(url) {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid GitHub URL format. Expected: https://github.com/owner/repo" }),
            );
        }
    }

    // Step 4: acquire repository data with maximum legal concurrency.
    // Partial failures land in their own slots and never abort.
    let (readme, repo_info, release_info) =
        acquire_repo_data(&state.github, github_url.as_deref(), provided_readme).await;

    let pre_usage = key_data.as_ref().map(|k| k.usage).unwrap_or(0);

    // Step 5: no README text at all short-circuits before charging
    let Some(readme_text) = readme.content else {
        let mut response = SummarizeResponse::shell(github_url, pre_usage, limit);
        response.apply_repo_info(&repo_info);
        response.apply_release_info(&release_info);
        response.error = Some(
            readme
                .error
                .unwrap_or_else(|| "No README found in this repository.".to_string()),
        );
        return Json(response).into_response();
    };

    // Step 6: charge usage exactly once, strictly before the summarization
    // call is issued, so a downstream failure still consumes quota. A
    // failed charge is logged but must not block the caller's summary.
    let charged = if let Some(record) = &key_data {
        match state.store.increment_usage(record.id).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Usage charge hit a missing key record {}", record.id);
                true
            }
            Err(e) => {
                warn!("Failed to charge usage: {}", e.log_safe());
                true
            }
        }
    } else {
        debug!("DEV MODE: usage charging skipped");
        false
    };

    // Step 7: summarize; a Failure still produces a 200 response body
    let summary_outcome = state.summarizer.summarize(&readme_text).await;

    // Step 8: assemble the unified response
    let usage = if charged { pre_usage + 1 } else { 0 };
    let mut response = SummarizeResponse::shell(github_url, usage, limit);
    response.apply_repo_info(&repo_info);
    response.apply_release_info(&release_info);
    response.set_readme_preview(&readme_text);

    match summary_outcome {
        SummaryOutcome::Success {
            summary,
            cool_facts,
            mock,
        } => {
            response.success = true;
            response.summary = Some(summary);
            response.cool_facts = cool_facts;
            if mock {
                response.mock = Some(true);
            }
        }
        SummaryOutcome::Failure(message) => {
            response.success = false;
            response.error = Some(message);
        }
    }

    Json(response).into_response()
}

/// Fan out the GitHub fetches appropriate to what the caller provided:
/// 3-way when the README must be fetched, 2-way when it was supplied
/// inline, README-only when the URL resists owner/repo extraction.
async fn acquire_repo_data(
    github: &GitHubClient,
    github_url: Option<&str>,
    provided_readme: Option<String>,
) -> (ReadmeResult, RepoInfo, ReleaseInfo) {
    let repo_ref = github_url.and_then(github::parse_repo_url);

    match (provided_readme, github_url, repo_ref) {
        (Some(text), _, Some(repo_ref)) => {
            debug!("Using provided README content, fetching metadata");
            let (repo_info, release_info) = tokio::join!(
                github.fetch_repo_info(&repo_ref.owner, &repo_ref.repo),
                github.fetch_latest_release(&repo_ref.owner, &repo_ref.repo),
            );
            (ReadmeResult::found(text), repo_info, release_info)
        }
        (Some(text), _, None) => {
            debug!("Using provided README content");
            (
                ReadmeResult::found(text),
                RepoInfo::default(),
                ReleaseInfo::default(),
            )
        }
        (None, Some(url), Some(repo_ref)) => {
            let (readme, repo_info, release_info) = tokio::join!(
                github.fetch_readme(url),
                github.fetch_repo_info(&repo_ref.owner, &repo_ref.repo),
                github.fetch_latest_release(&repo_ref.owner, &repo_ref.repo),
            );
            (readme, repo_info, release_info)
        }
        (None, Some(url), None) => {
            // Passed the shape check but not owner/repo extraction; only
            // the README probe is attempted
            let readme = github.fetch_readme(url).await;
            (readme, RepoInfo::default(), ReleaseInfo::default())
        }
        (None, None, _) => (
            ReadmeResult::missing("No input provided"),
            RepoInfo::default(),
            ReleaseInfo::default(),
        ),
    }
}

// --- Key management CRUD (dashboard surface) ---

/// Resolve the authenticated dashboard user from the opaque identity
/// headers supplied by the external provider
async fn dashboard_user(state: &AppState, headers: &HeaderMap) -> Result<crate::db::models::User> {
    let email = headers
        .get("x-user-email")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Unauthorized("Unauthorized - Please sign in".to_string()))?;

    let name = headers.get("x-user-name").and_then(|v| v.to_str().ok());
    let image = headers.get("x-user-image").and_then(|v| v.to_str().ok());

    state.store.get_or_create_user(email, name, image).await
}

async fn owned_key(state: &AppState, headers: &HeaderMap, id: i64) -> Result<ApiKey> {
    let user = dashboard_user(state, headers).await?;
    let record = state
        .store
        .get_key(id)
        .await?
        .filter(|k| k.user_id == user.id)
        .ok_or_else(|| Error::NotFound(format!("API key {id} not found")))?;
    Ok(record)
}

/// GET /api/api-keys - list the caller's keys, newest first
pub async fn list_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiKeyListResponse>> {
    let user = dashboard_user(&state, &headers).await?;
    let keys = state.store.list_by_owner(user.id).await?;

    Ok(Json(ApiKeyListResponse {
        data: keys.into_iter().map(ApiKeyData::from).collect(),
    }))
}

/// POST /api/api-keys - create a key for the caller
pub async fn create_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<CreateKeyRequest>>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    let user = dashboard_user(&state, &headers).await?;

    let name = payload
        .and_then(|Json(body)| body.name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(auth::default_key_name);

    let record = state
        .store
        .create_key(user.id, &name, &auth::generate_key())
        .await?;

    info!("Created API key {} for user {}", record.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            data: record.into(),
        }),
    ))
}

/// GET /api/api-keys/:id
pub async fn get_key(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ApiKeyResponse>> {
    let record = owned_key(&state, &headers, id).await?;
    Ok(Json(ApiKeyResponse {
        data: record.into(),
    }))
}

/// PATCH /api/api-keys/:id - rename
pub async fn rename_key(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<RenameKeyRequest>,
) -> Result<Json<ApiKeyResponse>> {
    let record = owned_key(&state, &headers, id).await?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Name must not be empty".to_string()));
    }

    let updated = state
        .store
        .rename_key(record.id, name)
        .await?
        .ok_or_else(|| Error::NotFound(format!("API key {id} not found")))?;

    Ok(Json(ApiKeyResponse {
        data: updated.into(),
    }))
}

/// GET /api/api-keys/:id/usage - usage stats for dashboard display
pub async fn key_usage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<crate::db::models::UsageStats>> {
    let record = owned_key(&state, &headers, id).await?;
    let stats = state
        .store
        .usage_stats(record.id, state.authenticator.usage_limit())
        .await;
    Ok(Json(stats))
}

/// DELETE /api/api-keys/:id
pub async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let record = owned_key(&state, &headers, id).await?;
    state.store.delete_key(record.id).await?;

    info!("Deleted API key {}", record.id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Liveness/readiness ---

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready
pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let database = match state.store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(Error::StoreUnconfigured) => "unconfigured".to_string(),
        Err(_) => "error".to_string(),
    };

    Json(ReadinessResponse {
        ready: database == "connected",
        database,
    })
}
