//! Scripted transport for exercising the executor and everything above it.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// A request as the transport saw it, with the (virtual) time it arrived.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct ScriptedReply {
    delay: Option<Duration>,
    outcome: Result<ApiResponse, TransportError>,
}

/// Mock implementation of the Transport trait.
///
/// Replies are queued per route ("METHOD path") and consumed in order.
/// Once a route's queue is empty its fallback reply is used, if any;
/// otherwise the mock answers 404.
///
/// ```rust,ignore
/// let transport = MockTransport::new();
/// transport.push_response("GET recipes", 503, "").await;
/// transport.push_json("GET recipes", 200, fixtures::catalog_json(&[(1, "Soup")])).await;
/// ```
#[derive(Default)]
pub struct MockTransport {
    scripts: Arc<RwLock<HashMap<String, VecDeque<ScriptedReply>>>>,
    fallbacks: Arc<RwLock<HashMap<String, ScriptedReply>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_response(&self, route: &str, status: u16, body: &str) {
        self.push(route, None, Ok(ApiResponse::new(status, body)))
            .await;
    }

    pub async fn push_json(&self, route: &str, status: u16, body: serde_json::Value) {
        self.push(route, None, Ok(ApiResponse::new(status, body.to_string())))
            .await;
    }

    /// Queue a JSON reply that arrives after `delay`.
    pub async fn push_delayed_json(
        &self,
        route: &str,
        delay: Duration,
        status: u16,
        body: serde_json::Value,
    ) {
        self.push(
            route,
            Some(delay),
            Ok(ApiResponse::new(status, body.to_string())),
        )
        .await;
    }

    pub async fn push_error(&self, route: &str, error: TransportError) {
        self.push(route, None, Err(error)).await;
    }

    /// Reply used for `route` whenever its queue is empty.
    pub async fn set_fallback_json(&self, route: &str, status: u16, body: serde_json::Value) {
        self.fallbacks.write().await.insert(
            route.to_string(),
            ScriptedReply {
                delay: None,
                outcome: Ok(ApiResponse::new(status, body.to_string())),
            },
        );
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self, route: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.request.route() == route)
            .count()
    }

    async fn push(
        &self,
        route: &str,
        delay: Option<Duration>,
        outcome: Result<ApiResponse, TransportError>,
    ) {
        self.scripts
            .write()
            .await
            .entry(route.to_string())
            .or_default()
            .push_back(ScriptedReply { delay, outcome });
    }

    async fn next_reply(&self, route: &str) -> Option<ScriptedReply> {
        let queued = self
            .scripts
            .write()
            .await
            .get_mut(route)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(reply) => Some(reply),
            None => self.fallbacks.read().await.get(route).cloned(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let route = request.route();
        self.requests.write().await.push(RecordedRequest {
            request: request.clone(),
            at: Instant::now(),
        });

        let Some(reply) = self.next_reply(&route).await else {
            return Ok(ApiResponse::new(404, format!("no scripted reply for {}", route)));
        };
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome
    }
}
