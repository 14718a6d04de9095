use crate::config::GitHubSettings;
use crate::error::{Error, Result};
use crate::github::models::{
    FullRepoData, ReadmeResult, ReleaseInfo, ReleaseResponse, RepoInfo, RepoRef,
    RepositoryResponse, TagEntry,
};
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

/// Parse `https://github.com/<owner>/<repo>` with an optional trailing
/// path. Anything else is a parse failure, not a fetch failure.
pub fn parse_repo_url(url: &str) -> Option<RepoRef> {
    let re = Regex::new(r"^https://github\.com/([^/]+)/([^/]+)(/.*)?$").unwrap();
    let caps = re.captures(url)?;
    Some(RepoRef {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
    })
}

/// Client for GitHub's REST API and raw-content host.
///
/// Every fetch resolves to a value with embedded success/error state;
/// none of them raises. A GitHub-side 403/429 surfaces as a generic
/// fetch error like any other non-success status.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base_url: String,
    raw_base_url: String,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(settings: &GitHubSettings) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("Blingo-GitHub-Summarizer/0.1"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        // Add authentication if token is provided
        if let Some(token) = &settings.token {
            let auth_value = format!("Bearer {token}");
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Internal(format!("Invalid GitHub token: {e}")))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            raw_base_url: settings.raw_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch README text by probing the `main` then `master` branch on the
    /// raw-content host; the first HTTP success wins. Transport failures are
    /// reported distinctly from a missing README.
    pub async fn fetch_readme(&self, github_url: &str) -> ReadmeResult {
        let Some(repo_ref) = parse_repo_url(github_url) else {
            return ReadmeResult::missing("Invalid GitHub URL format");
        };

        for branch in ["main", "master"] {
            let url = format!(
                "{}/{}/{}/{branch}/README.md",
                self.raw_base_url, repo_ref.owner, repo_ref.repo
            );
            debug!("Fetching README from: {}", url);

            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("README fetch transport error: {e}");
                    return ReadmeResult::missing(format!("Network error fetching README: {e}"));
                }
            };

            debug!("Response status: {}", response.status());
            if response.status().is_success() {
                match response.text().await {
                    Ok(content) => return ReadmeResult::found(content),
                    Err(e) => {
                        return ReadmeResult::missing(format!(
                            "Network error fetching README: {e}"
                        ))
                    }
                }
            }
        }

        ReadmeResult::missing("README not found in main or master branch")
    }

    /// Fetch repository metadata. Non-success statuses and transport errors
    /// both degrade to an all-null RepoInfo with an embedded message.
    pub async fn fetch_repo_info(&self, owner: &str, repo: &str) -> RepoInfo {
        let url = format!("{}/repos/{owner}/{repo}", self.api_base_url);
        debug!("Fetching repo info from: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return RepoInfo::unavailable(format!("Network error: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            warn!("GitHub API error fetching repo info: {status}");
            return RepoInfo::unavailable(format!("GitHub API error: {}", status.as_u16()));
        }

        match response.json::<RepositoryResponse>().await {
            Ok(data) => RepoInfo {
                stars: data.stargazers_count,
                forks: data.forks_count,
                open_issues: data.open_issues_count,
                language: data.language,
                description: data.description,
                homepage: data.homepage.filter(|s| !s.is_empty()),
                license: data.license.and_then(|l| l.name),
                error: None,
            },
            Err(e) => RepoInfo::unavailable(format!("Network error: {e}")),
        }
    }

    /// Fetch the latest release; a 404 specifically falls back to the most
    /// recent tag, other non-success statuses degrade to all-null.
    pub async fn fetch_latest_release(&self, owner: &str, repo: &str) -> ReleaseInfo {
        let url = format!("{}/repos/{owner}/{repo}/releases/latest", self.api_base_url);
        debug!("Fetching latest release from: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return ReleaseInfo::unavailable(format!("Network error: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                return self.fetch_latest_tag(owner, repo).await;
            }
            warn!("GitHub API error fetching latest release: {status}");
            return ReleaseInfo::unavailable("No releases found");
        }

        match response.json::<ReleaseResponse>().await {
            Ok(data) => ReleaseInfo {
                latest_version: data.tag_name,
                release_name: data.name,
                release_date: data.published_at,
                release_url: data.html_url,
                error: None,
            },
            Err(e) => ReleaseInfo::unavailable(format!("Network error: {e}")),
        }
    }

    /// Tag fallback for repositories without releases. Takes the first tag
    /// in the list; the tags endpoint is assumed newest-first, which GitHub
    /// does not actually guarantee.
    async fn fetch_latest_tag(&self, owner: &str, repo: &str) -> ReleaseInfo {
        let url = format!("{}/repos/{owner}/{repo}/tags", self.api_base_url);
        debug!("Fetching tags from: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return ReleaseInfo::unavailable(format!("Network error: {e}")),
        };

        if !response.status().is_success() {
            return ReleaseInfo::unavailable("No releases or tags found");
        }

        let tags = match response.json::<Vec<TagEntry>>().await {
            Ok(tags) => tags,
            Err(e) => return ReleaseInfo::unavailable(format!("Network error: {e}")),
        };

        let Some(latest) = tags.first() else {
            return ReleaseInfo::unavailable("No tags found");
        };

        ReleaseInfo {
            latest_version: Some(latest.name.clone()),
            release_name: Some(format!("Tag: {}", latest.name)),
            release_date: None,
            release_url: Some(format!(
                "https://github.com/{owner}/{repo}/releases/tag/{}",
                latest.name
            )),
            error: None,
        }
    }

    /// Fetch README, repo info, and release info for one URL with a 3-way
    /// fan-out. The fetches are independent; one failing never cancels or
    /// discards the others.
    pub async fn fetch_full_repo_data(&self, github_url: &str) -> FullRepoData {
        let Some(repo_ref) = parse_repo_url(github_url) else {
            return FullRepoData {
                repo_info: RepoInfo::unavailable("Invalid URL"),
                release_info: ReleaseInfo::unavailable("Invalid URL"),
                readme: ReadmeResult::missing("Invalid GitHub URL format"),
            };
        };

        let (repo_info, release_info, readme) = tokio::join!(
            self.fetch_repo_info(&repo_ref.owner, &repo_ref.repo),
            self.fetch_latest_release(&repo_ref.owner, &repo_ref.repo),
            self.fetch_readme(github_url),
        );

        FullRepoData {
            repo_info,
            release_info,
            readme,
        }
    }
}
