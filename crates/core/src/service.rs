//! Explicitly wired catalog services.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{AuthTokenCache, IdentityProvider, TokenCacheConfig};
use crate::catalog::{CategoryFilter, Record, RecordDraft, RecordId};
use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::events::EventHandle;
use crate::likes::{LikeError, LikeMutation, LikeToggleController};
use crate::remote::CatalogApi;
use crate::search::{SearchError, SearchOptions, SearchOrchestrator, SearchResults};
use crate::store::{LikedSet, LocalCatalogStore};
use crate::sync::{SyncCoordinator, SyncError, SyncOptions, SyncResult, WriteGate};
use crate::transport::{RequestExecutor, RetryPolicy, Transport};

/// Collaborators the host supplies.
pub struct ServiceDeps {
    pub transport: Arc<dyn Transport>,
    pub identity: Arc<dyn IdentityProvider>,
    pub connectivity: Arc<dyn Connectivity>,
    pub store: Arc<dyn LocalCatalogStore>,
    pub liked: Arc<dyn LikedSet>,
    pub events: EventHandle,
}

/// Facade over the coordinator, the like controller and search, acting
/// for the signed-in user.
pub struct CatalogService {
    api: Arc<CatalogApi>,
    coordinator: Arc<SyncCoordinator>,
    likes: Arc<LikeToggleController>,
    search: Arc<SearchOrchestrator>,
}

impl CatalogService {
    pub fn new(config: &Config, deps: ServiceDeps) -> Self {
        let tokens = Arc::new(AuthTokenCache::new(
            deps.identity,
            TokenCacheConfig::from(&config.auth),
        ));
        let executor = Arc::new(RequestExecutor::new(
            deps.transport,
            tokens,
            deps.connectivity,
            RetryPolicy::from(&config.retry),
        ));
        let api = Arc::new(CatalogApi::new(executor));
        let gate = WriteGate::new();

        let coordinator = Arc::new(SyncCoordinator::new(
            api.clone(),
            deps.store.clone(),
            deps.liked.clone(),
            gate.clone(),
            deps.events.clone(),
            SyncOptions::from(&config.sync),
        ));
        let likes = Arc::new(LikeToggleController::new(
            api.clone(),
            deps.store.clone(),
            deps.liked.clone(),
            gate,
            deps.events.clone(),
        ));
        let search = Arc::new(SearchOrchestrator::new(
            api.clone(),
            deps.store,
            deps.liked,
            deps.events,
            SearchOptions::from(&config.search),
        ));

        Self {
            api,
            coordinator,
            likes,
            search,
        }
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn likes(&self) -> &Arc<LikeToggleController> {
        &self.likes
    }

    pub fn searcher(&self) -> &Arc<SearchOrchestrator> {
        &self.search
    }

    /// The signed-in user's id, or an empty string when signed out.
    fn user_id(&self) -> String {
        self.api.executor().user_id().unwrap_or_default()
    }

    pub async fn sync(&self) -> Result<SyncResult, SyncError> {
        self.coordinator.sync().await
    }

    pub async fn set_liked(&self, id: RecordId, liked: bool) -> Result<LikeMutation, LikeError> {
        self.likes.set_liked(&self.user_id(), id, liked).await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        self.search.search(query).await
    }

    pub async fn create_record(&self, draft: RecordDraft) -> Result<Record, SyncError> {
        self.coordinator.create_record(&self.user_id(), draft).await
    }

    pub async fn update_record(&self, record: Record) -> Result<Record, SyncError> {
        self.coordinator.update_record(&self.user_id(), record).await
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<(), SyncError> {
        self.coordinator.delete_record(&self.user_id(), id).await
    }

    /// Cached records the user has liked.
    pub async fn favorites(&self) -> Result<Vec<Record>, SyncError> {
        let records = self.coordinator.cached_records().await?;
        Ok(records.into_iter().filter(|r| r.liked).collect())
    }

    /// Cached records matching `filter`. An empty local result triggers one
    /// sync when online, then the filter runs again.
    pub async fn filter_by_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Record>, SyncError> {
        let local: Vec<Record> = self
            .coordinator
            .cached_records()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        if !local.is_empty() || !self.api.executor().is_online() {
            return Ok(local);
        }

        debug!(?filter, "No cached match, syncing once");
        let records = match self.coordinator.sync().await {
            Ok(result) => result.records,
            Err(SyncError::NoCachedData { reason, .. }) => {
                warn!(%reason, "Sync produced no data for category filter");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }
}
