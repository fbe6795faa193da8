//! Remote catalog API: endpoints and wire decoding.

mod api;
mod dto;

pub use api::{CatalogApi, CatalogListing, MutationAck, SearchHit, SearchHits};
pub use dto::{decode_record, MalformedItem};
