//! Bearer token cache with TTL, single-flight refresh and timeout fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use super::{AuthError, IdentityProvider};
use crate::config::AuthConfig;
use crate::metrics;

/// Timing knobs for [`AuthTokenCache`].
#[derive(Debug, Clone)]
pub struct TokenCacheConfig {
    pub ttl: Duration,
    pub primary_timeout: Duration,
    pub fallback_timeout: Duration,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            primary_timeout: Duration::from_secs(15),
            fallback_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&AuthConfig> for TokenCacheConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.token_ttl_secs),
            primary_timeout: Duration::from_secs(config.primary_timeout_secs),
            fallback_timeout: Duration::from_secs(config.fallback_timeout_secs),
        }
    }
}

struct CachedToken {
    token: String,
    valid_until: Instant,
}

struct CacheState {
    cached: Option<CachedToken>,
}

/// Caches the identity provider's bearer token.
///
/// Concurrent callers share one outstanding fetch: the fetch runs while the
/// state lock is held, and a caller that waited on the lock reuses whatever
/// that fetch produced, even if it asked for a forced refresh.
pub struct AuthTokenCache {
    provider: Arc<dyn IdentityProvider>,
    config: TokenCacheConfig,
    state: Mutex<CacheState>,
    /// Bumped after every completed fetch.
    generation: AtomicU64,
}

impl AuthTokenCache {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: TokenCacheConfig) -> Self {
        Self {
            provider,
            config,
            state: Mutex::new(CacheState { cached: None }),
            generation: AtomicU64::new(0),
        }
    }

    /// Return a bearer token, fetching one when the cache is empty, expired
    /// or `force_refresh` is set.
    pub async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        let seen = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        let now = Instant::now();
        if let Some(cached) = state.cached.as_ref().filter(|c| c.valid_until > now) {
            let fresh_from_peer = self.generation.load(Ordering::Acquire) != seen;
            if !force_refresh || fresh_from_peer {
                debug!(shared = fresh_from_peer, "Using cached token");
                return Ok(cached.token.clone());
            }
        }

        let result = self.fetch(force_refresh).await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        metrics::TOKEN_FETCHES
            .with_label_values(&[if result.is_ok() { "success" } else { "failure" }])
            .inc();

        match result {
            Ok(credential) => {
                let mut lifetime = self.config.ttl;
                if let Some(remaining) = credential.remaining(Utc::now()) {
                    lifetime = lifetime.min(remaining);
                }
                state.cached = Some(CachedToken {
                    token: credential.token.clone(),
                    valid_until: Instant::now() + lifetime,
                });
                debug!(lifetime_secs = lifetime.as_secs(), "Cached fresh token");
                Ok(credential.token)
            }
            Err(e) => {
                state.cached = None;
                Err(e)
            }
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.provider.user_id()
    }

    pub fn permission(&self) -> super::Permission {
        self.provider.permission()
    }

    async fn fetch(&self, force_refresh: bool) -> Result<super::Credential, AuthError> {
        match timeout(
            self.config.primary_timeout,
            self.provider.credential(force_refresh),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_secs = self.config.primary_timeout.as_secs(),
                    "Token fetch timed out, retrying with forced refresh"
                );
                timeout(self.config.fallback_timeout, self.provider.credential(true))
                    .await
                    .map_err(|_| AuthError::Timeout(self.config.fallback_timeout))?
            }
        }
    }
}
