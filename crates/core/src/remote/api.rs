//! Typed catalog API on top of the request executor.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::dto::{
    decode_record, EnvelopeStatus, LikedIdsEnvelope, MalformedItem, MutationEnvelope,
    RecipesEnvelope, RecordPayload, SearchEnvelope,
};
use crate::catalog::{Record, RecordDraft, RecordId};
use crate::transport::{ApiError, ApiRequest, RequestExecutor};

/// Decoded catalog listing with the items that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct CatalogListing {
    pub records: Vec<Record>,
    pub skipped: Vec<MalformedItem>,
}

/// Result of a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationAck {
    pub id: RecordId,
    pub photo_url: Option<String>,
}

/// One search hit: either a bare id to resolve locally or a full record.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    Id(RecordId),
    Record(Record),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
    pub total_results: Option<u64>,
}

trait Enveloped {
    fn status(&self) -> &EnvelopeStatus;
}

macro_rules! enveloped {
    ($($t:ty),*) => {
        $(impl Enveloped for $t {
            fn status(&self) -> &EnvelopeStatus {
                &self.status
            }
        })*
    };
}

enveloped!(RecipesEnvelope, LikedIdsEnvelope, MutationEnvelope, SearchEnvelope);

/// The remote catalog's endpoints.
pub struct CatalogApi {
    executor: Arc<RequestExecutor>,
}

impl CatalogApi {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Fetch the full catalog. Malformed items are skipped, not fatal;
    /// for a repeated id the first occurrence wins.
    pub async fn list_catalog(&self) -> Result<CatalogListing, ApiError> {
        let envelope: RecipesEnvelope = self.call(&ApiRequest::get("recipes")).await?;
        let items = envelope
            .recipes
            .ok_or_else(|| ApiError::Decode("listing carries no recipes".to_string()))?;
        let listing = decode_records(&items);
        if let Some(count) = envelope.count {
            if count as usize != items.len() {
                debug!(count, received = items.len(), "Listing count mismatch");
            }
        }
        Ok(listing)
    }

    pub async fn list_liked_ids(&self) -> Result<Vec<RecordId>, ApiError> {
        let envelope: LikedIdsEnvelope = self.call(&ApiRequest::get("recipes/liked")).await?;
        Ok(envelope.recipe_ids)
    }

    pub async fn create_record(&self, draft: &RecordDraft) -> Result<MutationAck, ApiError> {
        let request = ApiRequest::post("recipes/add").json(payload(draft)?);
        let envelope: MutationEnvelope = self.call(&request).await?;
        let id = envelope
            .id
            .ok_or_else(|| ApiError::Decode("create response carries no id".to_string()))?;
        Ok(MutationAck {
            id,
            photo_url: envelope.photo,
        })
    }

    pub async fn update_record(
        &self,
        id: RecordId,
        draft: &RecordDraft,
    ) -> Result<MutationAck, ApiError> {
        let request = ApiRequest::put(format!("recipes/update/{}", id)).json(payload(draft)?);
        let envelope: MutationEnvelope = self.call(&request).await?;
        Ok(MutationAck {
            id: envelope.id.unwrap_or(id),
            photo_url: envelope.photo,
        })
    }

    pub async fn delete_record(&self, id: RecordId) -> Result<(), ApiError> {
        let request = ApiRequest::delete(format!("recipes/{}", id));
        self.call::<MutationEnvelope>(&request).await?;
        Ok(())
    }

    /// Flip the like state of a record on the server.
    pub async fn toggle_like(&self, id: RecordId) -> Result<(), ApiError> {
        let request = ApiRequest::post(format!("recipes/{}/like", id));
        self.call::<MutationEnvelope>(&request).await?;
        Ok(())
    }

    /// Ranked search. The query is sent quoted, as the endpoint expects a
    /// phrase.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchHits, ApiError> {
        let request = ApiRequest::get("search")
            .query("q", format!("\"{}\"", query.trim()))
            .query("page", page)
            .query("per_page", per_page);
        let envelope: SearchEnvelope = self.call(&request).await?;
        Ok(decode_hits(envelope))
    }

    /// Server-side substring search.
    pub async fn simple_search(&self, query: &str) -> Result<SearchHits, ApiError> {
        let request = ApiRequest::get("recipes/search-simple").query("q", query.trim());
        let envelope: SearchEnvelope = self.call(&request).await?;
        Ok(decode_hits(envelope))
    }

    async fn call<T>(&self, request: &ApiRequest) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Enveloped,
    {
        let response = self.executor.execute_ok(request).await?;
        // Some endpoints answer 204 with no body.
        let envelope: T = if response.body.trim().is_empty() {
            serde_json::from_str("{}").map_err(|e| ApiError::Decode(e.to_string()))?
        } else {
            response.json()?
        };
        if let Some(message) = envelope.status().rejection() {
            warn!(route = %request.route(), %message, "Server rejected request");
            return Err(ApiError::Rejected(message));
        }
        Ok(envelope)
    }
}

fn payload(draft: &RecordDraft) -> Result<Value, ApiError> {
    serde_json::to_value(RecordPayload::from(draft)).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode_records(items: &[Value]) -> CatalogListing {
    let mut listing = CatalogListing::default();
    let mut seen = std::collections::HashSet::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match decode_record(index, item) {
            Ok(record) if !seen.insert(record.id) => {
                warn!(record_id = record.id, index, "Duplicate id in listing, skipping");
                listing.skipped.push(MalformedItem {
                    index,
                    id: Some(record.id),
                    reason: "duplicate id".to_string(),
                });
            }
            Ok(record) => listing.records.push(record),
            Err(item) => {
                warn!(index, id = ?item.id, reason = %item.reason, "Skipping malformed item");
                listing.skipped.push(item);
            }
        }
    }
    listing
}

fn decode_hits(envelope: SearchEnvelope) -> SearchHits {
    let data = envelope.data.unwrap_or_default();
    let mut hits = Vec::with_capacity(data.results.len());
    for (index, value) in data.results.iter().enumerate() {
        let hit = match value {
            Value::Number(n) => n.as_i64().map(SearchHit::Id),
            Value::String(s) => s.trim().parse().ok().map(SearchHit::Id),
            Value::Object(_) => decode_record(index, value).ok().map(SearchHit::Record),
            _ => None,
        };
        match hit {
            Some(hit) => hits.push(hit),
            None => debug!(index, "Ignoring unreadable search hit"),
        }
    }
    SearchHits {
        hits,
        total_results: data.total_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthTokenCache, TokenCacheConfig};
    use crate::connectivity::ConnectivityFlag;
    use crate::error::ErrorKind;
    use crate::testing::{fixtures, MockIdentityProvider, MockTransport};
    use crate::transport::RetryPolicy;
    use serde_json::json;

    fn api() -> (Arc<MockTransport>, CatalogApi) {
        let transport = Arc::new(MockTransport::new());
        let tokens = Arc::new(AuthTokenCache::new(
            Arc::new(MockIdentityProvider::new()),
            TokenCacheConfig::default(),
        ));
        let executor = Arc::new(RequestExecutor::new(
            transport.clone(),
            tokens,
            Arc::new(ConnectivityFlag::new(true)),
            RetryPolicy::none(),
        ));
        (transport, CatalogApi::new(executor))
    }

    #[tokio::test]
    async fn test_list_catalog_skips_malformed_and_duplicates() {
        let (transport, api) = api();
        transport
            .push_json(
                "GET recipes",
                200,
                json!({
                    "success": true,
                    "count": 4,
                    "recipes": [
                        fixtures::record_json(1, "Soup"),
                        {"title": "no id"},
                        fixtures::record_json(2, "Stew"),
                        fixtures::record_json(1, "Soup again")
                    ]
                }),
            )
            .await;

        let listing = api.list_catalog().await.unwrap();

        let ids: Vec<_> = listing.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(listing.records[0].title, "Soup");
        assert_eq!(listing.skipped.len(), 2);
        assert_eq!(listing.skipped[1].reason, "duplicate id");
    }

    #[tokio::test]
    async fn test_listing_without_recipes_is_malformed() {
        let (transport, api) = api();
        transport
            .push_json("GET recipes", 200, json!({"success": true}))
            .await;
        transport.push_response("GET recipes", 200, "").await;

        let err = api.list_catalog().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let err = api.list_catalog().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));

        transport
            .push_json("GET recipes", 200, json!({"recipes": []}))
            .await;
        assert!(api.list_catalog().await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_envelope_is_permanent() {
        let (transport, api) = api();
        transport
            .push_json(
                "GET recipes/liked",
                200,
                json!({"success": false, "message": "token expired"}),
            )
            .await;

        let err = api.list_liked_ids().await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "token expired"));
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[tokio::test]
    async fn test_create_returns_ack() {
        let (transport, api) = api();
        transport
            .push_json(
                "POST recipes/add",
                201,
                json!({"success": true, "id": 77, "photo": "https://img/77.jpg"}),
            )
            .await;

        let ack = api.create_record(&fixtures::draft("Pancakes")).await.unwrap();

        assert_eq!(ack.id, 77);
        assert_eq!(ack.photo_url.as_deref(), Some("https://img/77.jpg"));
        let sent = &transport.requests().await[0].request;
        assert_eq!(sent.body.as_ref().unwrap()["title"], "Pancakes");
    }

    #[tokio::test]
    async fn test_update_defaults_id() {
        let (transport, api) = api();
        transport
            .push_json("PUT recipes/update/5", 200, json!({"success": true}))
            .await;

        let ack = api.update_record(5, &fixtures::draft("Pancakes")).await.unwrap();
        assert_eq!(ack.id, 5);
    }

    #[tokio::test]
    async fn test_search_sends_quoted_query_and_accepts_ids() {
        let (transport, api) = api();
        transport
            .push_json(
                "GET search",
                200,
                json!({"data": {"results": ["3", 4, fixtures::record_json(5, "Soup"), true], "total_results": 3}}),
            )
            .await;

        let hits = api.search(" soup ", 1, 20).await.unwrap();

        assert_eq!(hits.total_results, Some(3));
        assert_eq!(hits.hits.len(), 3);
        assert_eq!(hits.hits[0], SearchHit::Id(3));
        assert_eq!(hits.hits[1], SearchHit::Id(4));
        assert!(matches!(&hits.hits[2], SearchHit::Record(r) if r.id == 5));

        let sent = &transport.requests().await[0].request;
        assert!(sent
            .query
            .contains(&("q".to_string(), "\"soup\"".to_string())));
        assert!(sent
            .query
            .contains(&("per_page".to_string(), "20".to_string())));
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let (transport, api) = api();
        transport.push_response("DELETE recipes/4", 204, "").await;
        api.delete_record(4).await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_like_hits_like_route() {
        let (transport, api) = api();
        transport
            .push_json("POST recipes/9/like", 200, json!({"success": true}))
            .await;
        api.toggle_like(9).await.unwrap();
        assert_eq!(transport.request_count("POST recipes/9/like").await, 1);
    }
}
