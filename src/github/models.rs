use serde::{Deserialize, Serialize};

/// Owner/repo pair parsed from a repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Repository metadata, all fields independently nullable. Produced fresh
/// per request; an embedded error never invalidates sibling fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoInfo {
    pub stars: Option<i64>,
    pub forks: Option<i64>,
    pub open_issues: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepoInfo {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Latest release (or tag fallback) metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub latest_version: Option<String>,
    pub release_name: Option<String>,
    pub release_date: Option<String>,
    pub release_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReleaseInfo {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// README fetch result: raw text, or nothing plus a reason
#[derive(Debug, Clone, Default)]
pub struct ReadmeResult {
    pub content: Option<String>,
    pub error: Option<String>,
}

impl ReadmeResult {
    pub fn found(content: String) -> Self {
        Self {
            content: Some(content),
            error: None,
        }
    }

    pub fn missing(error: impl Into<String>) -> Self {
        Self {
            content: None,
            error: Some(error.into()),
        }
    }
}

/// The three independent fetches joined for one request
#[derive(Debug, Clone)]
pub struct FullRepoData {
    pub repo_info: RepoInfo,
    pub release_info: ReleaseInfo,
    pub readme: ReadmeResult,
}

// --- GitHub API wire types ---

#[derive(Debug, Deserialize)]
pub struct RepositoryResponse {
    pub stargazers_count: Option<i64>,
    pub forks_count: Option<i64>,
    pub open_issues_count: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<LicenseField>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseField {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseResponse {
    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub published_at: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagEntry {
    pub name: String,
}
