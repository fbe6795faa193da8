pub mod auth;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod likes;
pub mod metrics;
pub mod remote;
pub mod search;
pub mod service;
pub mod store;
pub mod sync;
pub mod testing;
pub mod transport;

pub use auth::{
    create_identity_provider, AuthError, AuthTokenCache, Credential, IdentityProvider,
    SignedOutIdentity, StaticTokenIdentity, TokenCacheConfig,
};
pub use catalog::{
    reconcile, CategoryFilter, Ingredient, IngredientList, Reconciliation, Record, RecordDraft,
    RecordId, Step, StepList, ValidationError,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use error::ErrorKind;
pub use events::{
    create_event_channel, CatalogEvent, EventEnvelope, EventHandle, EventReceiver, SearchOutcome,
    SyncSource,
};
pub use likes::{LikeError, LikeMutation, LikeToggleController, MutationState};
pub use remote::CatalogApi;
pub use search::{SearchError, SearchOptions, SearchOrchestrator, SearchPhase, SearchResults};
pub use service::{CatalogService, ServiceDeps};
pub use store::{ChangeSet, LikedSet, LocalCatalogStore, SqliteCatalogStore, StoreError};
pub use sync::{LikedSyncResult, SyncCoordinator, SyncError, SyncOptions, SyncResult, WriteGate};
pub use transport::{
    ApiError, ApiRequest, ApiResponse, ReqwestTransport, RequestExecutor, RetryPolicy, Transport,
    TransportError,
};
