//! Search integration tests: ranked search, local fallback and
//! supersession of stale queries.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use cookbook_core::{
    testing::{fixtures, MemoryCatalogStore, MemoryLikedSet, TestHarness},
    SearchError, SearchOptions, SearchOutcome,
};

fn harness(options: SearchOptions) -> TestHarness {
    TestHarness::builder()
        .store(Arc::new(MemoryCatalogStore::with_records(vec![
            fixtures::record(1, "Tomato Soup"),
            fixtures::record(2, "Apple pie"),
            fixtures::record(3, "Soup dumplings"),
        ])))
        .liked(Arc::new(MemoryLikedSet::with_ids(&[3])))
        .search_options(options)
        .build()
}

fn hits(ids: &[i64]) -> serde_json::Value {
    json!({"success": true, "data": {"results": ids, "total_results": ids.len()}})
}

#[tokio::test]
async fn test_disabled_smart_search_uses_local_match_only() {
    let h = harness(SearchOptions {
        smart_search_enabled: false,
        ..SearchOptions::default()
    });

    let results = h.search.search("soup").await.unwrap();

    assert_eq!(results.outcome, SearchOutcome::LocalOnly);
    let ids: Vec<_> = results.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert!(results.records[1].liked);
    assert_eq!(h.transport.request_count("GET search").await, 0);
}

#[tokio::test]
async fn test_unknown_ids_fall_back_locally() {
    let h = harness(SearchOptions::default());
    h.transport.push_json("GET search", 200, hits(&[99])).await;

    let results = h.search.search("pie").await.unwrap();

    assert_eq!(results.outcome, SearchOutcome::LocalOnly);
    assert_eq!(results.records[0].id, 2);
}

#[tokio::test]
async fn test_malformed_response_falls_back_locally() {
    let h = harness(SearchOptions::default());
    h.transport.push_response("GET search", 200, "<html>").await;

    let results = h.search.search("apple").await.unwrap();

    assert_eq!(results.outcome, SearchOutcome::LocalOnly);
    assert_eq!(results.records.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_never_overwrites_newer_query() {
    let mut h = harness(SearchOptions::default());
    // "a" answers after "ab"
    h.transport
        .push_delayed_json("GET search", Duration::from_secs(3), 200, hits(&[2]))
        .await;
    h.transport
        .push_delayed_json("GET search", Duration::from_secs(1), 200, hits(&[1]))
        .await;

    let search = h.search.clone();
    let first = tokio::spawn(async move { search.search("a").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let search = h.search.clone();
    let second = tokio::spawn(async move { search.search("ab").await });

    let second = second.await.unwrap().unwrap();
    let first = first.await.unwrap();

    assert!(matches!(first, Err(SearchError::Superseded { .. })));
    assert_eq!(second.query, "ab");
    assert_eq!(second.records[0].id, 1);

    let completed: Vec<_> = h
        .events
        .drain()
        .into_iter()
        .filter(|e| e.event.event_type() == "search_completed")
        .collect();
    assert_eq!(completed.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_local_search_is_dropped() {
    let h = harness(SearchOptions::default());
    h.transport
        .push_delayed_json("GET search", Duration::from_secs(2), 200, hits(&[]))
        .await;
    h.online.set_online(true);

    let search = h.search.clone();
    let first = tokio::spawn(async move { search.search("soup").await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    h.online.set_online(false);
    let second = h.search.search("pie").await.unwrap();

    assert!(first.await.unwrap().unwrap_err().is_superseded());
    assert_eq!(second.outcome, SearchOutcome::LocalOnly);
    assert_eq!(second.records[0].id, 2);
}
