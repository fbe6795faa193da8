//! Ranked remote search with local fallback and stale-result suppression.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{SearchError, SearchOptions, SearchPhase, SearchResults};
use crate::catalog::{Record, RecordId};
use crate::events::{CatalogEvent, EventHandle, SearchOutcome};
use crate::metrics;
use crate::remote::{CatalogApi, SearchHit, SearchHits};
use crate::store::{run_blocking, LikedSet, LocalCatalogStore, StoreError};

/// Runs searches; each new call supersedes the previous one.
///
/// A superseded search stops waiting on the remote immediately and returns
/// `SearchError::Superseded`, so its results never reach the caller.
pub struct SearchOrchestrator {
    api: Arc<CatalogApi>,
    store: Arc<dyn LocalCatalogStore>,
    liked: Arc<dyn LikedSet>,
    events: EventHandle,
    options: SearchOptions,
    sequence: AtomicU64,
    current: watch::Sender<u64>,
    phase: Mutex<(u64, SearchPhase)>,
}

impl SearchOrchestrator {
    pub fn new(
        api: Arc<CatalogApi>,
        store: Arc<dyn LocalCatalogStore>,
        liked: Arc<dyn LikedSet>,
        events: EventHandle,
        options: SearchOptions,
    ) -> Self {
        let (current, _) = watch::channel(0);
        Self {
            api,
            store,
            liked,
            events,
            options,
            sequence: AtomicU64::new(0),
            current,
            phase: Mutex::new((0, SearchPhase::Idle)),
        }
    }

    /// Phase of the most recent search.
    pub fn phase(&self) -> SearchPhase {
        self.phase.lock().unwrap_or_else(|e| e.into_inner()).1
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.send_replace(sequence);
        let mut newer = self.current.subscribe();

        let query = query.trim().to_string();
        if query.is_empty() {
            self.set_phase(sequence, SearchPhase::Idle);
            return Ok(SearchResults {
                sequence,
                query,
                outcome: SearchOutcome::LocalOnly,
                records: Vec::new(),
                total_results: None,
            });
        }

        let online = self.api.executor().is_online();
        let remote = self.options.smart_search_enabled && online;
        let mut ranked = None;

        if remote {
            self.set_phase(sequence, SearchPhase::SmartSearchPending);
            ranked = self
                .unless_superseded(sequence, &mut newer, self.smart_search(&query))
                .await?;

            if ranked.is_none() && self.options.server_fallback {
                self.set_phase(sequence, SearchPhase::FallbackPending);
                ranked = self
                    .unless_superseded(sequence, &mut newer, self.simple_search(&query))
                    .await?;
            }
        } else {
            debug!(
                smart_search = self.options.smart_search_enabled,
                online, "Skipping remote search"
            );
        }

        let (outcome, records, total_results) = match ranked {
            Some((records, total)) => (SearchOutcome::Success, records, total),
            None => {
                if remote {
                    self.set_phase(sequence, SearchPhase::FallbackPending);
                }
                let records = self.local_search(&query).await?;
                (SearchOutcome::LocalOnly, records, None)
            }
        };

        if !self.is_current(sequence) {
            return Err(self.superseded(sequence));
        }
        self.set_phase(sequence, outcome.into());

        let label = match outcome {
            SearchOutcome::Success => "success",
            SearchOutcome::LocalOnly => "local_only",
        };
        metrics::SEARCHES.with_label_values(&[label]).inc();
        info!(sequence, %query, outcome = label, results = records.len(), "Search completed");
        self.events.try_emit(CatalogEvent::SearchCompleted {
            sequence,
            query: query.clone(),
            outcome,
            results: records.len(),
        });

        Ok(SearchResults {
            sequence,
            query,
            outcome,
            records,
            total_results,
        })
    }

    /// Ranked remote search. `None` means fall back: error, timeout, or
    /// nothing usable in the response.
    async fn smart_search(
        &self,
        query: &str,
    ) -> Result<Option<(Vec<Record>, Option<u64>)>, SearchError> {
        let call = self
            .api
            .search(query, self.options.page, self.options.per_page);
        let hits = match tokio::time::timeout(self.options.timeout, call).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(%query, error = %e, "Ranked search failed, falling back");
                return Ok(None);
            }
            Err(_) => {
                warn!(%query, timeout = ?self.options.timeout, "Ranked search timed out, falling back");
                return Ok(None);
            }
        };
        self.resolve(hits).await
    }

    async fn simple_search(
        &self,
        query: &str,
    ) -> Result<Option<(Vec<Record>, Option<u64>)>, SearchError> {
        match self.api.simple_search(query).await {
            Ok(hits) => self.resolve(hits).await,
            Err(e) => {
                warn!(%query, error = %e, "Server substring search failed");
                Ok(None)
            }
        }
    }

    /// Turn remote hits into records. Bare ids are looked up locally and
    /// dropped if unknown; `liked` always comes from the liked set.
    async fn resolve(
        &self,
        hits: SearchHits,
    ) -> Result<Option<(Vec<Record>, Option<u64>)>, SearchError> {
        if hits.hits.is_empty() {
            return Ok(None);
        }
        let total = hits.total_results;
        let store = self.store.clone();
        let liked = self.liked.clone();

        let records = run_blocking(move || {
            let liked_ids: HashSet<RecordId> = liked.all_ids()?.into_iter().collect();
            let needs_lookup = hits.hits.iter().any(|h| matches!(h, SearchHit::Id(_)));
            let local: HashMap<RecordId, Record> = if needs_lookup {
                store.get_all()?.into_iter().map(|r| (r.id, r)).collect()
            } else {
                HashMap::new()
            };

            let mut seen = HashSet::new();
            let mut records = Vec::with_capacity(hits.hits.len());
            for hit in hits.hits {
                let record = match hit {
                    SearchHit::Id(id) => local.get(&id).cloned(),
                    SearchHit::Record(record) => Some(record),
                };
                let Some(mut record) = record else {
                    continue;
                };
                if !seen.insert(record.id) {
                    continue;
                }
                record.liked = liked_ids.contains(&record.id);
                records.push(record);
            }
            Ok::<_, StoreError>(records)
        })
        .await?;

        if records.is_empty() {
            debug!("No remote hit resolved to a known record");
            return Ok(None);
        }
        Ok(Some((records, total)))
    }

    /// Case-insensitive title substring match over the cached catalog.
    async fn local_search(&self, query: &str) -> Result<Vec<Record>, SearchError> {
        let needle = query.to_lowercase();
        let store = self.store.clone();
        let liked = self.liked.clone();
        let records = run_blocking(move || {
            let liked_ids: HashSet<RecordId> = liked.all_ids()?.into_iter().collect();
            let mut matches: Vec<Record> = store
                .get_all()?
                .into_iter()
                .filter(|r| r.title_matches(&needle))
                .collect();
            for record in &mut matches {
                record.liked = liked_ids.contains(&record.id);
            }
            Ok(matches)
        })
        .await?;
        Ok(records)
    }

    async fn unless_superseded<F, T>(
        &self,
        sequence: u64,
        newer: &mut watch::Receiver<u64>,
        work: F,
    ) -> Result<T, SearchError>
    where
        F: Future<Output = Result<T, SearchError>>,
    {
        tokio::select! {
            biased;
            _ = superseded(sequence, newer) => Err(self.superseded(sequence)),
            result = work => result,
        }
    }

    fn superseded(&self, sequence: u64) -> SearchError {
        debug!(sequence, "Search superseded, dropping its results");
        metrics::SEARCHES.with_label_values(&["superseded"]).inc();
        SearchError::Superseded { sequence }
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == sequence
    }

    fn set_phase(&self, sequence: u64, phase: SearchPhase) {
        let mut current = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if sequence >= current.0 {
            *current = (sequence, phase);
        }
    }
}

/// Resolves once a search newer than `sequence` has been issued.
async fn superseded(sequence: u64, newer: &mut watch::Receiver<u64>) {
    loop {
        if *newer.borrow_and_update() != sequence {
            return;
        }
        if newer.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
