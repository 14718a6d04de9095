use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default per-key usage quota
pub const DEFAULT_USAGE_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub quota: QuotaConfig,
    pub github: GitHubSettings,
    pub summarizer: SummarizerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; when absent the key store runs in the
    /// explicit Unconfigured state and auth-gated routes return 503
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// IP-level requests/second for the governor layer (burst protection,
    /// independent of the per-key quota)
    pub api_rate_limit: u64,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Global per-key usage limit
    pub usage_limit: i64,
    /// Deployment-level auth bypass for local development.
    /// Never derived from request data; off unless DEV_BYPASS_AUTH=true.
    pub dev_bypass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// Optional GitHub personal access token for increased rate limits
    pub token: Option<String>,
    pub api_base_url: String,
    pub raw_base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerSettings {
    /// Completion API key; when absent the deterministic offline
    /// fallback runs and results are marked mock
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl SummarizerSettings {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: &str) -> Result<T> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| Error::Config(format!("Invalid {name} value")))
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_parse("PORT", "3000")?;
        let api_rate_limit = env_parse("API_RATE_LIMIT", "100")?;
        let max_request_body_size = env_parse("MAX_REQUEST_BODY_SIZE", "1048576")?;

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", "25")?;
        let min_connections = env_parse("DATABASE_MIN_CONNECTIONS", "5")?;
        let connection_timeout_seconds = env_parse("DATABASE_CONNECTION_TIMEOUT", "30")?;
        let idle_timeout_seconds = env_parse("DATABASE_IDLE_TIMEOUT", "600")?;

        let usage_limit = env_parse("USAGE_LIMIT", "1000")?;
        let dev_bypass = std::env::var("DEV_BYPASS_AUTH")
            .map(|v| v == "true")
            .unwrap_or(false);

        let github_token = std::env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty());
        let github_api_base_url = std::env::var("GITHUB_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());
        let github_raw_base_url = std::env::var("GITHUB_RAW_BASE_URL")
            .unwrap_or_else(|_| "https://raw.githubusercontent.com".to_string());
        let github_timeout_seconds = env_parse("GITHUB_TIMEOUT", "30")?;

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty());
        let openai_api_base_url = std::env::var("OPENAI_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let openai_temperature = env_parse("OPENAI_TEMPERATURE", "0.2")?;

        Ok(Settings {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                connection_timeout_seconds,
                idle_timeout_seconds,
            },
            server: ServerConfig {
                host,
                port,
                api_rate_limit,
                max_request_body_size,
            },
            quota: QuotaConfig {
                usage_limit,
                dev_bypass,
            },
            github: GitHubSettings {
                token: github_token,
                api_base_url: github_api_base_url,
                raw_base_url: github_raw_base_url,
                timeout_seconds: github_timeout_seconds,
            },
            summarizer: SummarizerSettings {
                api_key: openai_api_key,
                api_base_url: openai_api_base_url,
                model: openai_model,
                temperature: openai_temperature,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.quota.usage_limit <= 0 {
            return Err(Error::Config("Usage limit must be positive".to_string()));
        }

        if self.server.api_rate_limit == 0 {
            return Err(Error::Config("API rate limit must be non-zero".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        database: DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            max_connections: 5,
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
            api_base_url: "https://api.github.com".to_string(),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            timeout_seconds: 30,
        },
        summarizer: SummarizerSettings {
            api_key: None,
            api_base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        let mut settings = test_settings();
        assert!(settings.validate().is_ok());

        settings.server.port = 0;
        assert!(settings.validate().is_err());

        settings.server.port = 3000;
        settings.quota.usage_limit = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_summarizer_configured() {
        let mut settings = test_settings();
        assert!(!settings.summarizer.is_configured());

        settings.summarizer.api_key = Some("sk-test".to_string());
        assert!(settings.summarizer.is_configured());

        settings.summarizer.api_key = Some(String::new());
        assert!(!settings.summarizer.is_configured());
    }
}
