pub mod client;
pub mod models;

pub use client::{parse_repo_url, GitHubClient};
pub use models::{FullRepoData, ReadmeResult, ReleaseInfo, RepoInfo, RepoRef};
