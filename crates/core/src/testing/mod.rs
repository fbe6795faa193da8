//! Mock collaborators and fixtures for unit and integration tests.
//!
//! Everything here runs without a network or a database file:
//!
//! ```rust,ignore
//! use cookbook_core::testing::{fixtures, TestHarness};
//!
//! let h = TestHarness::new();
//! h.transport.push_json("GET recipes", 200, fixtures::catalog_json(&[(1, "Soup")])).await;
//! let result = h.coordinator.sync().await?;
//! ```

pub mod fixtures;
mod harness;
mod memory_store;
mod mock_identity;
mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::{MemoryCatalogStore, MemoryLikedSet};
pub use mock_identity::MockIdentityProvider;
pub use mock_transport::{MockTransport, RecordedRequest};
