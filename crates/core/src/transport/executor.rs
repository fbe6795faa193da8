//! Resilient request execution: credential attachment, retry with
//! exponential backoff, and a forced token refresh on 401.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::{ApiRequest, ApiResponse, RetryPolicy, Transport, TransportError};
use crate::auth::{AuthError, AuthTokenCache, Permission};
use crate::connectivity::Connectivity;
use crate::error::ErrorKind;
use crate::metrics;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No network connection")]
    Offline,

    #[error("Request rejected as unauthenticated")]
    Unauthenticated,

    #[error("Server responded with HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Network unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Offline => ErrorKind::Offline,
            ApiError::Unauthenticated => ErrorKind::Unauthenticated,
            ApiError::Status { status, .. } if *status >= 500 || *status == 429 => {
                ErrorKind::Transient
            }
            ApiError::Status { .. } => ErrorKind::Permanent,
            ApiError::Transport(_) => ErrorKind::Transient,
            ApiError::Decode(_) => ErrorKind::Malformed,
            ApiError::Rejected(_) => ErrorKind::Permanent,
            ApiError::Auth(e) => e.kind(),
        }
    }
}

impl ApiResponse {
    /// Turn a non-2xx response into the matching [`ApiError`].
    pub fn error_for_status(self) -> Result<ApiResponse, ApiError> {
        match self.status {
            s if (200..300).contains(&s) => Ok(self),
            401 => Err(ApiError::Unauthenticated),
            status => Err(ApiError::Status {
                status,
                body: self.body,
            }),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

enum RetryReason {
    ServerError(u16),
    RateLimited,
    Transport,
    Unauthorized,
}

impl RetryReason {
    fn label(&self) -> &'static str {
        match self {
            RetryReason::ServerError(_) => "server_error",
            RetryReason::RateLimited => "rate_limited",
            RetryReason::Transport => "transport_error",
            RetryReason::Unauthorized => "unauthorized",
        }
    }
}

/// Executes API requests with credentials attached and transient failures
/// retried per [`RetryPolicy`].
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    tokens: Arc<AuthTokenCache>,
    connectivity: Arc<dyn Connectivity>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<AuthTokenCache>,
        connectivity: Arc<dyn Connectivity>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            tokens,
            connectivity,
            policy,
        }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn user_id(&self) -> Option<String> {
        self.tokens.user_id()
    }

    pub fn permission(&self) -> Permission {
        self.tokens.permission()
    }

    /// Execute a request.
    ///
    /// Retries 5xx, 429 and transport failures with backoff slept before
    /// each retry. A 401 forces a token refresh and is retried once without
    /// backoff. When retries run out, the last response is returned as `Ok`
    /// (callers inspect its status) or the last transport failure as
    /// [`ApiError::Transport`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if !self.connectivity.is_online() {
            metrics::REQUEST_ATTEMPTS
                .with_label_values(&["offline"])
                .inc();
            debug!(route = %request.route(), "Offline, not sending request");
            return Err(ApiError::Offline);
        }

        let started = Instant::now();
        let mut retries = 0u32;
        let mut force_refresh = false;
        let mut refreshed_after_401 = false;

        let result = loop {
            let token = self.bearer_token(force_refresh).await?;
            force_refresh = false;

            let mut attempt = request.clone();
            attempt.user_id = self.tokens.user_id();
            attempt.bearer_token = token;
            let had_token = attempt.bearer_token.is_some();

            let outcome = self.transport.send(&attempt).await;
            record_attempt(&outcome);

            let reason = match &outcome {
                Ok(resp) if resp.status == 401 && had_token && !refreshed_after_401 => {
                    Some(RetryReason::Unauthorized)
                }
                Ok(resp) if resp.status == 429 => Some(RetryReason::RateLimited),
                Ok(resp) if resp.status >= 500 => Some(RetryReason::ServerError(resp.status)),
                Ok(_) => None,
                Err(_) => Some(RetryReason::Transport),
            };

            let Some(reason) = reason else {
                break outcome.map_err(ApiError::from);
            };

            if retries >= self.policy.max_retries {
                warn!(
                    route = %request.route(),
                    retries,
                    reason = reason.label(),
                    "Retries exhausted"
                );
                break outcome.map_err(ApiError::from);
            }
            retries += 1;
            metrics::REQUEST_RETRIES
                .with_label_values(&[reason.label()])
                .inc();

            match reason {
                RetryReason::Unauthorized => {
                    warn!(route = %request.route(), "Got 401, refreshing token");
                    refreshed_after_401 = true;
                    force_refresh = true;
                }
                other => {
                    let delay = self.policy.delay_for(retries);
                    match (&other, &outcome) {
                        (RetryReason::ServerError(status), _) => debug!(
                            route = %request.route(),
                            attempt = retries,
                            status,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying after server error"
                        ),
                        (_, Err(e)) => debug!(
                            route = %request.route(),
                            attempt = retries,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying after transport error"
                        ),
                        _ => debug!(
                            route = %request.route(),
                            attempt = retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying after rate limit"
                        ),
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        };

        metrics::REQUEST_DURATION
            .with_label_values(&[request.method.as_str()])
            .observe(started.elapsed().as_secs_f64());
        result
    }

    /// Execute and require a 2xx response.
    pub async fn execute_ok(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute(request).await?.error_for_status()
    }

    /// Execute, require a 2xx response and decode its JSON body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ApiError> {
        self.execute_ok(request).await?.json()
    }

    /// Token for the next attempt; signed-out sessions send none.
    async fn bearer_token(&self, force_refresh: bool) -> Result<Option<String>, ApiError> {
        match self.tokens.get_token(force_refresh).await {
            Ok(token) => Ok(Some(token)),
            Err(AuthError::NotSignedIn) => Ok(None),
            Err(e) => Err(ApiError::Auth(e)),
        }
    }
}

fn record_attempt(outcome: &Result<ApiResponse, TransportError>) {
    let label = match outcome {
        Ok(r) if r.is_success() => "success",
        Ok(r) if r.status >= 500 => "server_error",
        Ok(_) => "client_error",
        Err(_) => "transport_error",
    };
    metrics::REQUEST_ATTEMPTS.with_label_values(&[label]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCacheConfig;
    use crate::connectivity::ConnectivityFlag;
    use crate::testing::{MockIdentityProvider, MockTransport};
    use std::time::Duration;

    struct Harness {
        transport: Arc<MockTransport>,
        identity: Arc<MockIdentityProvider>,
        online: Arc<ConnectivityFlag>,
        executor: RequestExecutor,
    }

    fn harness(policy: RetryPolicy) -> Harness {
        let transport = Arc::new(MockTransport::new());
        let identity = Arc::new(MockIdentityProvider::new());
        let online = Arc::new(ConnectivityFlag::new(true));
        let tokens = Arc::new(AuthTokenCache::new(
            identity.clone(),
            TokenCacheConfig::default(),
        ));
        let executor =
            RequestExecutor::new(transport.clone(), tokens, online.clone(), policy);
        Harness {
            transport,
            identity,
            online,
            executor,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let h = harness(RetryPolicy::default());
        h.transport.push_response("GET recipes", 200, "{}").await;

        let resp = h.executor.execute(&ApiRequest::get("recipes")).await.unwrap();

        assert_eq!(resp.status, 200);
        let requests = h.transport.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].request.bearer_token.is_some());
        assert_eq!(requests[0].request.user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_errors_with_increasing_backoff() {
        let h = harness(RetryPolicy::default());
        h.transport.push_response("GET recipes", 500, "").await;
        h.transport.push_response("GET recipes", 500, "").await;
        h.transport.push_response("GET recipes", 200, "ok").await;

        let resp = h.executor.execute(&ApiRequest::get("recipes")).await.unwrap();

        assert_eq!(resp.status, 200);
        let requests = h.transport.requests().await;
        assert_eq!(requests.len(), 3);
        let gap1 = requests[1].at - requests[0].at;
        let gap2 = requests[2].at - requests[1].at;
        assert_eq!(gap1, Duration::from_millis(1000));
        assert_eq!(gap2, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_response() {
        let h = harness(RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        });
        for _ in 0..3 {
            h.transport.push_response("GET recipes", 503, "busy").await;
        }

        let resp = h.executor.execute(&ApiRequest::get("recipes")).await.unwrap();

        assert_eq!(resp.status, 503);
        assert_eq!(h.transport.requests().await.len(), 3);

        let err = resp.error_for_status().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_transport_error() {
        let h = harness(RetryPolicy {
            max_retries: 1,
            ..RetryPolicy::default()
        });
        h.transport
            .push_error("GET recipes", TransportError::Timeout)
            .await;
        h.transport
            .push_error("GET recipes", TransportError::Connect("refused".into()))
            .await;

        let err = h
            .executor
            .execute(&ApiRequest::get("recipes"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Transport(TransportError::Connect(_))
        ));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_not_retried() {
        let h = harness(RetryPolicy::default());
        h.transport.push_response("DELETE recipes/4", 404, "").await;

        let err = h
            .executor
            .execute_ok(&ApiRequest::delete("recipes/4"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert_eq!(h.transport.requests().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retried() {
        let h = harness(RetryPolicy::default());
        h.transport.push_response("GET recipes", 429, "").await;
        h.transport.push_response("GET recipes", 200, "").await;

        let resp = h.executor.execute(&ApiRequest::get("recipes")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(h.transport.requests().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_fails_fast() {
        let h = harness(RetryPolicy::default());
        h.online.set_online(false);

        let err = h
            .executor
            .execute(&ApiRequest::get("recipes"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Offline));
        assert!(h.transport.requests().await.is_empty());
        assert_eq!(h.identity.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_refreshes_token_before_retry() {
        let h = harness(RetryPolicy::default());
        h.identity.push_token("stale").await;
        h.identity.push_token("fresh").await;
        h.transport.push_response("GET recipes/liked", 401, "").await;
        h.transport.push_response("GET recipes/liked", 200, "").await;

        let started = tokio::time::Instant::now();
        let resp = h
            .executor
            .execute(&ApiRequest::get("recipes/liked"))
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        let requests = h.transport.requests().await;
        assert_eq!(requests[0].request.bearer_token.as_deref(), Some("stale"));
        assert_eq!(requests[1].request.bearer_token.as_deref(), Some("fresh"));
        assert_eq!(h.identity.calls().await, vec![false, true]);
        // no backoff for an auth retry
        assert_eq!(requests[1].at, started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_unauthorized_is_surfaced() {
        let h = harness(RetryPolicy::default());
        h.transport.push_response("GET recipes/liked", 401, "").await;
        h.transport.push_response("GET recipes/liked", 401, "").await;

        let err = h
            .executor
            .execute_ok(&ApiRequest::get("recipes/liked"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated));
        assert_eq!(h.transport.requests().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_out_sends_without_token() {
        let transport = Arc::new(MockTransport::new());
        let identity = Arc::new(MockIdentityProvider::signed_out());
        let tokens = Arc::new(AuthTokenCache::new(identity, TokenCacheConfig::default()));
        let executor = RequestExecutor::new(
            transport.clone(),
            tokens,
            Arc::new(ConnectivityFlag::new(true)),
            RetryPolicy::default(),
        );
        transport.push_response("GET recipes", 200, "").await;

        executor.execute(&ApiRequest::get("recipes")).await.unwrap();

        let requests = transport.requests().await;
        assert!(requests[0].request.bearer_token.is_none());
        assert!(requests[0].request.user_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_json_decodes_body() {
        #[derive(Debug, serde::Deserialize)]
        struct Body {
            count: u32,
        }
        let h = harness(RetryPolicy::none());
        h.transport
            .push_response("GET recipes", 200, r#"{"count": 3}"#)
            .await;

        let body: Body = h
            .executor
            .execute_json(&ApiRequest::get("recipes"))
            .await
            .unwrap();
        assert_eq!(body.count, 3);

        h.transport.push_response("GET recipes", 200, "nope").await;
        let err = h
            .executor
            .execute_json::<Body>(&ApiRequest::get("recipes"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
