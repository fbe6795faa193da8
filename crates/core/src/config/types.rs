use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Permission;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Remote catalog endpoint and transport timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Base URL of the catalog API (e.g., "https://api.example.com/")
    pub base_url: String,
    #[serde(default = "default_io_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_io_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_io_timeout")]
    pub write_timeout_secs: u64,
}

fn default_io_timeout() -> u64 {
    30
}

impl RemoteConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout; the longer of read and write.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(self.write_timeout_secs))
    }
}

/// Retry policy for transient failures
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    1.5
}

/// Identity and token cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Signed-in user; absent means signed out
    #[serde(default)]
    pub user_id: Option<String>,
    /// Static bearer token (secret)
    #[serde(default)]
    pub token: Option<String>,
    /// Access level of the configured user ("user" or "admin")
    #[serde(default)]
    pub permission: Permission,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_secs: u64,
    #[serde(default = "default_fallback_timeout")]
    pub fallback_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            token: None,
            permission: Permission::default(),
            token_ttl_secs: default_token_ttl(),
            primary_timeout_secs: default_primary_timeout(),
            fallback_timeout_secs: default_fallback_timeout(),
        }
    }
}

fn default_token_ttl() -> u64 {
    30 * 60
}

fn default_primary_timeout() -> u64 {
    15
}

fn default_fallback_timeout() -> u64 {
    5
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cookbook.db")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Treat an empty remote listing as a legitimate full deletion.
    #[serde(default = "default_true")]
    pub trust_empty_remote: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            trust_empty_remote: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_true")]
    pub smart_search_enabled: bool,
    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Try the server-side simple search before the local fallback
    #[serde(default)]
    pub server_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            smart_search_enabled: true,
            timeout_ms: default_search_timeout_ms(),
            page: default_page(),
            per_page: default_per_page(),
            server_fallback: false,
        }
    }
}

fn default_search_timeout_ms() -> u64 {
    10_000
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_worker_threads() -> usize {
    4
}

fn default_event_buffer() -> usize {
    256
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub remote: RemoteConfig,
    pub retry: RetryConfig,
    pub auth: SanitizedAuthConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub search: SearchConfig,
    pub runtime: RuntimeConfig,
}

/// Sanitized auth config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub token_configured: bool,
    pub permission: Permission,
    pub token_ttl_secs: u64,
    pub primary_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            remote: config.remote.clone(),
            retry: config.retry.clone(),
            auth: SanitizedAuthConfig {
                user_id: config.auth.user_id.clone(),
                token_configured: config.auth.token.as_ref().is_some_and(|t| !t.is_empty()),
                permission: config.auth.permission,
                token_ttl_secs: config.auth.token_ttl_secs,
                primary_timeout_secs: config.auth.primary_timeout_secs,
                fallback_timeout_secs: config.auth.fallback_timeout_secs,
            },
            database: config.database.clone(),
            sync: config.sync.clone(),
            search: config.search.clone(),
            runtime: config.runtime.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config_uses_defaults() {
        let toml = r#"
[remote]
base_url = "https://recipes.example.com/"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.connect_timeout_secs, 30);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.multiplier, 1.5);
        assert_eq!(config.auth.token_ttl_secs, 1800);
        assert!(config.auth.user_id.is_none());
        assert!(config.sync.trust_empty_remote);
        assert!(config.search.smart_search_enabled);
        assert!(!config.search.server_fallback);
        assert_eq!(config.search.per_page, 20);
        assert_eq!(config.runtime.worker_threads, 4);
        assert_eq!(config.database.path.to_str().unwrap(), "cookbook.db");
    }

    #[test]
    fn test_deserialize_missing_remote_fails() {
        let toml = r#"
[retry]
max_retries = 1
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_timeout_takes_longer_of_read_and_write() {
        let toml = r#"
[remote]
base_url = "https://recipes.example.com/"
read_timeout_secs = 60
write_timeout_secs = 20
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.remote.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let toml = r#"
[remote]
base_url = "https://recipes.example.com/"

[auth]
user_id = "42"
token = "secret-token"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.auth.token_configured);
        assert_eq!(sanitized.auth.user_id.as_deref(), Some("42"));

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-token"));
    }

    #[test]
    fn test_sanitized_config_empty_token_not_configured() {
        let toml = r#"
[remote]
base_url = "https://recipes.example.com/"

[auth]
token = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!SanitizedConfig::from(&config).auth.token_configured);
    }
}
