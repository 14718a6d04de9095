use crate::db::models::ApiKey;
use crate::github::{ReleaseInfo, RepoInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const README_PREVIEW_CHARS: usize = 500;

/// Body of POST /api/github-summarizer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub github_url: Option<String>,
    pub readme_content: Option<String>,
}

/// The unified response shape. Every field is always present, nulled or
/// empty when inapplicable; only `mock` and `error` are conditional keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub success: bool,
    pub github_url: Option<String>,
    pub has_readme: bool,
    pub readme_preview: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "cool_facts")]
    pub cool_facts: Vec<String>,
    pub stars: Option<i64>,
    pub forks: Option<i64>,
    pub open_issues: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub latest_version: Option<String>,
    pub release_name: Option<String>,
    pub release_date: Option<String>,
    pub release_url: Option<String>,
    pub usage: i64,
    pub limit: i64,
    pub remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummarizeResponse {
    /// Empty shell with every field at its null/default value
    pub fn shell(github_url: Option<String>, usage: i64, limit: i64) -> Self {
        Self {
            success: false,
            github_url,
            has_readme: false,
            readme_preview: None,
            summary: None,
            cool_facts: Vec::new(),
            stars: None,
            forks: None,
            open_issues: None,
            language: None,
            description: None,
            homepage: None,
            license: None,
            latest_version: None,
            release_name: None,
            release_date: None,
            release_url: None,
            usage,
            limit,
            remaining: (limit - usage).max(0),
            mock: None,
            error: None,
        }
    }

    pub fn apply_repo_info(&mut self, info: &RepoInfo) {
        self.stars = info.stars;
        self.forks = info.forks;
        self.open_issues = info.open_issues;
        self.language = info.language.clone();
        self.description = info.description.clone();
        self.homepage = info.homepage.clone();
        self.license = info.license.clone();
    }

    pub fn apply_release_info(&mut self, info: &ReleaseInfo) {
        self.latest_version = info.latest_version.clone();
        self.release_name = info.release_name.clone();
        self.release_date = info.release_date.clone();
        self.release_url = info.release_url.clone();
    }

    pub fn set_readme_preview(&mut self, readme: &str) {
        self.has_readme = true;
        let preview: String = readme.chars().take(README_PREVIEW_CHARS).collect();
        self.readme_preview = if readme.chars().count() > README_PREVIEW_CHARS {
            Some(format!("{preview}..."))
        } else {
            Some(preview)
        };
    }
}

/// Body of GET /api/github-summarizer
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
    pub usage: i64,
    pub limit: i64,
    pub remaining: i64,
}

/// Key record as exposed to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyData {
    pub id: i64,
    pub name: String,
    pub key: String,
    pub usage: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyData {
    fn from(record: ApiKey) -> Self {
        Self {
            id: record.id,
            name: record.name,
            key: record.key,
            usage: record.usage,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyListResponse {
    pub data: Vec<ApiKeyData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub data: ApiKeyData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateKeyRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameKeyRequest {
    pub name: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_serializes_every_field() {
        let response = SummarizeResponse::shell(None, 0, 1000);
        let value = serde_json::to_value(&response).unwrap();
        let object = value.as_object().unwrap();

        for field in [
            "success",
            "githubUrl",
            "hasReadme",
            "readmePreview",
            "summary",
            "cool_facts",
            "stars",
            "forks",
            "openIssues",
            "language",
            "description",
            "homepage",
            "license",
            "latestVersion",
            "releaseName",
            "releaseDate",
            "releaseUrl",
            "usage",
            "limit",
            "remaining",
        ] {
            assert!(object.contains_key(field), "missing field {field}");
        }

        // Conditional keys are absent unless set
        assert!(!object.contains_key("mock"));
        assert!(!object.contains_key("error"));
    }

    #[test]
    fn test_conditional_keys_appear_when_set() {
        let mut response = SummarizeResponse::shell(None, 0, 1000);
        response.mock = Some(true);
        response.error = Some("boom".to_string());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["mock"], serde_json::json!(true));
        assert_eq!(value["error"], serde_json::json!("boom"));
    }

    #[test]
    fn test_readme_preview_truncation() {
        let mut response = SummarizeResponse::shell(None, 0, 1000);
        response.set_readme_preview("short");
        assert_eq!(response.readme_preview.as_deref(), Some("short"));

        let long = "x".repeat(600);
        response.set_readme_preview(&long);
        let preview = response.readme_preview.unwrap();
        assert_eq!(preview.chars().count(), 503);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_remaining_never_negative() {
        let response = SummarizeResponse::shell(None, 1500, 1000);
        assert_eq!(response.remaining, 0);
    }
}
