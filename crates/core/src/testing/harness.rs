//! Fully wired components over mock collaborators.

use std::sync::Arc;

use super::{MemoryCatalogStore, MemoryLikedSet, MockIdentityProvider, MockTransport};
use crate::auth::{AuthTokenCache, TokenCacheConfig};
use crate::connectivity::ConnectivityFlag;
use crate::events::{create_event_channel, EventReceiver};
use crate::likes::LikeToggleController;
use crate::remote::CatalogApi;
use crate::search::{SearchOptions, SearchOrchestrator};
use crate::sync::{SyncCoordinator, SyncOptions, WriteGate};
use crate::transport::{RequestExecutor, RetryPolicy};

/// Every component sharing one transport, store pair and write gate.
///
/// ```rust,ignore
/// let mut h = TestHarness::new();
/// h.transport.push_json("GET recipes", 200, fixtures::catalog_json(&[(1, "Soup")])).await;
/// h.coordinator.sync().await?;
/// let events = h.events.drain();
/// ```
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub identity: Arc<MockIdentityProvider>,
    pub online: Arc<ConnectivityFlag>,
    pub api: Arc<CatalogApi>,
    pub store: Arc<MemoryCatalogStore>,
    pub liked: Arc<MemoryLikedSet>,
    pub gate: WriteGate,
    pub coordinator: Arc<SyncCoordinator>,
    pub likes: Arc<LikeToggleController>,
    pub search: Arc<SearchOrchestrator>,
    pub events: EventReceiver,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }
}

#[derive(Default)]
pub struct TestHarnessBuilder {
    store: Option<Arc<MemoryCatalogStore>>,
    liked: Option<Arc<MemoryLikedSet>>,
    identity: Option<Arc<MockIdentityProvider>>,
    retry: Option<RetryPolicy>,
    sync_options: Option<SyncOptions>,
    search_options: Option<SearchOptions>,
}

impl TestHarnessBuilder {
    pub fn store(mut self, store: Arc<MemoryCatalogStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn liked(mut self, liked: Arc<MemoryLikedSet>) -> Self {
        self.liked = Some(liked);
        self
    }

    pub fn identity(mut self, identity: Arc<MockIdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn signed_out(self) -> Self {
        self.identity(Arc::new(MockIdentityProvider::signed_out()))
    }

    /// Defaults to no retries.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.sync_options = Some(options);
        self
    }

    pub fn search_options(mut self, options: SearchOptions) -> Self {
        self.search_options = Some(options);
        self
    }

    pub fn build(self) -> TestHarness {
        let transport = Arc::new(MockTransport::new());
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(MockIdentityProvider::new()));
        let online = Arc::new(ConnectivityFlag::new(true));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCatalogStore::new()));
        let liked = self
            .liked
            .unwrap_or_else(|| Arc::new(MemoryLikedSet::new()));

        let tokens = Arc::new(AuthTokenCache::new(
            identity.clone(),
            TokenCacheConfig::default(),
        ));
        let executor = Arc::new(RequestExecutor::new(
            transport.clone(),
            tokens,
            online.clone(),
            self.retry.unwrap_or_else(RetryPolicy::none),
        ));
        let api = Arc::new(CatalogApi::new(executor));
        let gate = WriteGate::new();
        let (events, receiver) = create_event_channel(256);

        let coordinator = Arc::new(SyncCoordinator::new(
            api.clone(),
            store.clone(),
            liked.clone(),
            gate.clone(),
            events.clone(),
            self.sync_options.unwrap_or_default(),
        ));
        let likes = Arc::new(LikeToggleController::new(
            api.clone(),
            store.clone(),
            liked.clone(),
            gate.clone(),
            events.clone(),
        ));
        let search = Arc::new(SearchOrchestrator::new(
            api.clone(),
            store.clone(),
            liked.clone(),
            events,
            self.search_options.unwrap_or_default(),
        ));

        TestHarness {
            transport,
            identity,
            online,
            api,
            store,
            liked,
            gate,
            coordinator,
            likes,
            search,
            events: receiver,
        }
    }
}
