use std::env;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

pub const URL_KEY: &str = "SELECTOR_URL";
pub const API_KEY_KEY: &str = "SELECTOR_AI_API_KEY";
pub const TIMEOUT_KEY: &str = "SELECTOR_TIMEOUT_SECS";
pub const CHAT_PATH_KEY: &str = "SELECTOR_CHAT_PATH";
pub const QUERY_PATH_KEY: &str = "SELECTOR_QUERY_PATH";
pub const PHRASES_PATH_KEY: &str = "SELECTOR_PHRASES_PATH";

/// Backend request timeout when `SELECTOR_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_CHAT_PATH: &str = "/api/collab2-slack/copilot/v1/chat";
pub const DEFAULT_QUERY_PATH: &str = "/api/collab2-slack/command";
pub const DEFAULT_PHRASES_PATH: &str = "/api/nlt2/alias";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load a specific env file. Unlike `load_dotenv`, a missing file is an error.
pub fn load_env_file(path: &std::path::Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path).map_err(|e| ConfigError::Invalid {
        key: "--env-file",
        reason: format!("{}: {}", path.display(), e),
    })?;
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ── Selector backend config ───────────────────────────────────

/// Connection settings for the Selector HTTP API.
///
/// Built once at startup and handed to the backend invoker. The API key is
/// redacted from `Debug` output and never serialized.
#[derive(Clone, Serialize)]
pub struct SelectorConfig {
    /// Base URL without trailing slash, e.g. `https://selector.example.com`.
    pub base_url: String,
    #[serde(skip)]
    api_key: String,
    pub timeout: Duration,
    pub chat_path: String,
    pub query_path: String,
    pub phrases_path: String,
}

impl SelectorConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            query_path: DEFAULT_QUERY_PATH.to_string(),
            phrases_path: DEFAULT_PHRASES_PATH.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = non_empty(lookup(URL_KEY)).ok_or(ConfigError::Missing(URL_KEY))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: URL_KEY,
                reason: format!("expected an http(s) URL, got '{}'", base_url),
            });
        }

        let api_key = non_empty(lookup(API_KEY_KEY)).ok_or(ConfigError::Missing(API_KEY_KEY))?;

        let timeout_secs = match non_empty(lookup(TIMEOUT_KEY)) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: TIMEOUT_KEY,
                        reason: format!("expected a positive number of seconds, got '{}'", raw),
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let path_or = |key: &str, default: &str| {
            non_empty(lookup(key)).unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            chat_path: path_or(CHAT_PATH_KEY, DEFAULT_CHAT_PATH),
            query_path: path_or(QUERY_PATH_KEY, DEFAULT_QUERY_PATH),
            phrases_path: path_or(PHRASES_PATH_KEY, DEFAULT_PHRASES_PATH),
            ..Self::new(base_url, api_key).with_timeout(Duration::from_secs(timeout_secs))
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Join the base URL with a relative endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  selector:    url={}", self.base_url);
        tracing::info!("  timeout:     {}s", self.timeout.as_secs());
        tracing::info!(
            "  endpoints:   chat={}, query={}, phrases={}",
            self.chat_path,
            self.query_path,
            self.phrases_path
        );
    }
}

impl fmt::Debug for SelectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("chat_path", &self.chat_path)
            .field("query_path", &self.query_path)
            .field("phrases_path", &self.phrases_path)
            .finish()
    }
}
