//! Sync lifecycle integration tests.
//!
//! These run the coordinator against a SQLite store on disk and a scripted
//! transport, covering convergence, cache fallback and atomicity.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use cookbook_core::{
    create_event_channel,
    testing::{
        fixtures, MemoryCatalogStore, MemoryLikedSet, MockIdentityProvider, MockTransport,
        TestHarness,
    },
    AuthTokenCache, CatalogApi, ConnectivityFlag, ErrorKind, EventReceiver, LikedSet,
    LocalCatalogStore, RequestExecutor, RetryPolicy, SqliteCatalogStore, SyncCoordinator,
    SyncError, SyncOptions, SyncSource, TokenCacheConfig, WriteGate,
};

/// Coordinator over a SQLite file.
struct SqliteHarness {
    transport: Arc<MockTransport>,
    online: Arc<ConnectivityFlag>,
    store: Arc<SqliteCatalogStore>,
    coordinator: SyncCoordinator,
    events: EventReceiver,
    _temp_dir: TempDir,
}

impl SqliteHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteCatalogStore::new(&temp_dir.path().join("catalog.db"))
                .expect("Failed to create store"),
        );
        let transport = Arc::new(MockTransport::new());
        let online = Arc::new(ConnectivityFlag::new(true));
        let tokens = Arc::new(AuthTokenCache::new(
            Arc::new(MockIdentityProvider::new()),
            TokenCacheConfig::default(),
        ));
        let executor = Arc::new(RequestExecutor::new(
            transport.clone(),
            tokens,
            online.clone(),
            RetryPolicy::none(),
        ));
        let (events, receiver) = create_event_channel(64);
        let coordinator = SyncCoordinator::new(
            Arc::new(CatalogApi::new(executor)),
            store.clone(),
            store.clone(),
            WriteGate::new(),
            events,
            SyncOptions::default(),
        );

        Self {
            transport,
            online,
            store,
            coordinator,
            events: receiver,
            _temp_dir: temp_dir,
        }
    }

    async fn script_listing(&self, records: &[(i64, &str)], liked: &[i64]) {
        self.transport
            .push_json("GET recipes", 200, fixtures::catalog_json(records))
            .await;
        self.transport
            .push_json("GET recipes/liked", 200, fixtures::liked_json(liked))
            .await;
    }

    fn local_ids(&self) -> Vec<i64> {
        LocalCatalogStore::all_ids(self.store.as_ref()).unwrap()
    }
}

#[tokio::test]
async fn test_two_syncs_converge_on_latest_snapshot() {
    let h = SqliteHarness::new();

    h.script_listing(&[(1, "Soup"), (2, "Stew"), (3, "Salad")], &[])
        .await;
    h.coordinator.sync().await.unwrap();
    assert_eq!(h.local_ids(), vec![1, 2, 3]);

    h.script_listing(&[(2, "Stew v2"), (4, "Curry")], &[]).await;
    let result = h.coordinator.sync().await.unwrap();

    assert_eq!(h.local_ids(), vec![2, 4]);
    let added: Vec<_> = result.added.iter().map(|r| r.id).collect();
    let updated: Vec<_> = result.updated.iter().map(|r| r.id).collect();
    assert_eq!(added, vec![4]);
    assert_eq!(updated, vec![2]);
    assert_eq!(result.removed_ids, vec![1, 3]);
}

#[tokio::test]
async fn test_surviving_records_take_remote_content() {
    let h = SqliteHarness::new();
    h.script_listing(&[(1, "Soup")], &[]).await;
    h.coordinator.sync().await.unwrap();

    let mut changed = fixtures::record_json(1, "Better soup");
    changed["instructions"] = json!([
        {"number": 1, "instruction": "Roast the vegetables first"},
        {"number": 7, "instruction": "Blend until completely smooth"}
    ]);
    changed["photo"] = json!("https://img/1.jpg");
    h.transport
        .push_json("GET recipes", 200, json!({"recipes": [changed]}))
        .await;
    h.transport
        .push_json("GET recipes/liked", 200, fixtures::liked_json(&[]))
        .await;
    h.coordinator.sync().await.unwrap();

    let stored = h.store.get(1).unwrap().unwrap();
    assert_eq!(stored.title, "Better soup");
    assert_eq!(stored.photo_url.as_deref(), Some("https://img/1.jpg"));
    let numbers: Vec<_> = stored.steps.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn test_liked_flag_matches_liked_set_after_sync() {
    let h = SqliteHarness::new();
    h.script_listing(&[(1, "Soup"), (2, "Stew"), (3, "Salad")], &[1, 3])
        .await;

    let result = h.coordinator.sync().await.unwrap();

    for record in &result.records {
        assert_eq!(record.liked, h.store.contains(record.id).unwrap());
    }
    assert_eq!(LikedSet::all_ids(h.store.as_ref()).unwrap(), vec![1, 3]);
}

#[tokio::test]
async fn test_offline_serves_cache_unchanged() {
    let mut h = SqliteHarness::new();
    h.script_listing(&[(1, "Soup"), (2, "Stew")], &[2]).await;
    let first = h.coordinator.sync().await.unwrap();
    h.events.drain();

    h.online.set_online(false);
    let cached = h.coordinator.sync().await.unwrap();

    assert_eq!(cached.source, SyncSource::Cache);
    assert!(cached.is_degraded());
    assert_eq!(cached.records, first.records);
    assert_eq!(h.transport.requests().await.len(), 2);

    let events = h.events.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.event_type(), "sync_degraded");
}

#[tokio::test]
async fn test_malformed_items_do_not_abort_sync() {
    let h = SqliteHarness::new();
    h.transport
        .push_json(
            "GET recipes",
            200,
            json!({"recipes": [
                fixtures::record_json(1, "Soup"),
                {"id": "not a number", "title": "Broken"},
                {"id": 3, "title": "  "},
                fixtures::record_json(4, "Curry")
            ]}),
        )
        .await;

    let result = h.coordinator.sync().await.unwrap();

    assert_eq!(result.skipped, 2);
    assert_eq!(h.local_ids(), vec![1, 4]);
}

#[tokio::test]
async fn test_trusted_empty_remote_clears_cache() {
    let h = SqliteHarness::new();
    h.script_listing(&[(1, "Soup"), (2, "Stew")], &[]).await;
    h.coordinator.sync().await.unwrap();

    h.script_listing(&[], &[]).await;
    let result = h.coordinator.sync().await.unwrap();

    assert_eq!(result.source, SyncSource::Remote);
    assert_eq!(result.removed_ids, vec![1, 2]);
    assert!(h.local_ids().is_empty());
}

#[tokio::test]
async fn test_listing_without_recipes_keeps_cache() {
    let h = SqliteHarness::new();
    h.script_listing(&[(1, "Soup"), (2, "Stew")], &[]).await;
    h.coordinator.sync().await.unwrap();

    h.transport
        .push_json("GET recipes", 200, json!({"success": true}))
        .await;
    h.transport
        .push_json("GET recipes/liked", 200, fixtures::liked_json(&[]))
        .await;
    let result = h.coordinator.sync().await.unwrap();

    assert_eq!(result.source, SyncSource::Cache);
    assert!(result.removed_ids.is_empty());
    assert_eq!(h.local_ids(), vec![1, 2]);

    h.transport.push_response("GET recipes", 200, "").await;
    h.transport
        .push_json("GET recipes/liked", 200, fixtures::liked_json(&[]))
        .await;
    let result = h.coordinator.sync().await.unwrap();

    assert_eq!(result.source, SyncSource::Cache);
    assert_eq!(h.local_ids(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fall_back_to_cache() {
    let store = Arc::new(MemoryCatalogStore::with_records(vec![fixtures::record(
        5, "Cached",
    )]));
    let h = TestHarness::builder()
        .store(store)
        .retry(RetryPolicy::default())
        .build();
    for _ in 0..4 {
        h.transport.push_response("GET recipes", 503, "").await;
    }

    let result = h.coordinator.sync().await.unwrap();

    assert_eq!(result.source, SyncSource::Cache);
    assert_eq!(h.transport.request_count("GET recipes").await, 4);
    assert_eq!(h.store.ids(), vec![5]);
}

#[tokio::test]
async fn test_store_failure_leaves_cache_untouched() {
    let store = Arc::new(MemoryCatalogStore::with_records(vec![
        fixtures::record(1, "One"),
        fixtures::record(2, "Two"),
    ]));
    let liked = Arc::new(MemoryLikedSet::with_ids(&[1]));
    let h = TestHarness::builder().store(store).liked(liked).build();
    h.transport
        .push_json("GET recipes", 200, fixtures::catalog_json(&[(2, "Two v2"), (3, "Three")]))
        .await;
    h.transport
        .push_json("GET recipes/liked", 200, fixtures::liked_json(&[3]))
        .await;
    h.store.set_fail_writes(true);

    let err = h.coordinator.sync().await.unwrap_err();

    assert!(matches!(err, SyncError::Store(_)));
    assert_eq!(err.kind(), ErrorKind::LocalStoreFailure);
    assert_eq!(h.store.ids(), vec![1, 2]);
    assert_eq!(h.store.get_record(2).unwrap().title, "Two");
    assert_eq!(h.liked.ids(), vec![1]);
}

#[tokio::test]
async fn test_signed_out_sync_skips_liked_ids() {
    let h = TestHarness::builder().signed_out().build();
    h.transport
        .push_json("GET recipes", 200, fixtures::catalog_json(&[(1, "Soup")]))
        .await;

    h.coordinator.sync().await.unwrap();

    assert_eq!(h.transport.request_count("GET recipes/liked").await, 0);
    assert_eq!(h.store.ids(), vec![1]);
}
