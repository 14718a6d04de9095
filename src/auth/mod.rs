use crate::db::{models::ApiKey, KeyStore};
use crate::error::Error;
use axum::http::HeaderMap;
use rand::Rng;
use tracing::{debug, warn};

/// Prefix carried by every issued key
pub const KEY_PREFIX: &str = "blingo-";

const KEY_RANDOM_LEN: usize = 32;

/// Outcome of authorizing a presented key. Ephemeral, consumed by the
/// orchestrator on the same request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Key exists and is under quota; snapshot taken at lookup time
    Valid(ApiKey),
    /// Key missing, unknown, or the store lookup failed (fail closed)
    Invalid(String),
    /// Key exists but has exhausted its quota
    RateLimited { record: ApiKey, reason: String },
    /// No DATABASE_URL at startup; surfaces as 503, not an auth failure
    StoreUnconfigured,
    /// Development bypass matched; store never touched, usage never charged
    Bypass,
}

/// Validates presented keys against the store and enforces the global
/// per-key usage quota.
#[derive(Clone)]
pub struct Authenticator {
    store: KeyStore,
    usage_limit: i64,
    dev_bypass: bool,
}

impl Authenticator {
    pub fn new(store: KeyStore, usage_limit: i64, dev_bypass: bool) -> Self {
        Self {
            store,
            usage_limit,
            dev_bypass,
        }
    }

    pub fn usage_limit(&self) -> i64 {
        self.usage_limit
    }

    /// Authorize a presented key: exactly one store lookup, then a quota
    /// check against the snapshot.
    pub async fn authorize(&self, presented: Option<&str>) -> AuthOutcome {
        // Deployment-level bypass; requires the flag AND the key prefix,
        // never request data alone
        if self.dev_bypass {
            if let Some(key) = presented {
                if key.starts_with(KEY_PREFIX) {
                    warn!("DEV MODE: bypassing key validation and usage charging");
                    return AuthOutcome::Bypass;
                }
            }
        }

        let key = match presented {
            Some(k) if !k.is_empty() => k,
            _ => return AuthOutcome::Invalid("API key is required".to_string()),
        };

        let record = match self.store.find_by_key(key).await {
            Ok(record) => record,
            Err(Error::StoreUnconfigured) => return AuthOutcome::StoreUnconfigured,
            Err(e) => {
                warn!("Key lookup failed: {}", e.log_safe());
                return AuthOutcome::Invalid(format!("Database error: {e}"));
            }
        };

        let record = match record {
            Some(record) => record,
            None => return AuthOutcome::Invalid("Invalid API key".to_string()),
        };

        if record.usage >= self.usage_limit {
            debug!(
                "Key {} rate limited at {}/{}",
                record.id, record.usage, self.usage_limit
            );
            let reason = format!(
                "Rate limit exceeded. You have used {}/{} requests. \
                 Please upgrade your plan or wait for the limit to reset.",
                record.usage, self.usage_limit
            );
            return AuthOutcome::RateLimited { record, reason };
        }

        AuthOutcome::Valid(record)
    }
}

/// Extract the presented key from headers: `x-api-key` first, then
/// `Authorization: Bearer <key>`
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Generate a fresh secret token: `blingo-` + 32 random alphanumerics
pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..KEY_RANDOM_LEN)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect();
    format!("{KEY_PREFIX}{suffix}")
}

/// Default display name for keys created without one
pub fn default_key_name() -> String {
    format!("API Key {}", chrono::Utc::now().format("%b %-d, %Y"))
}
