//! Remote call plumbing: the transport seam, the reqwest implementation
//! and the resilient executor on top of it.

mod executor;
mod http;
mod retry;
mod types;

pub use executor::{ApiError, RequestExecutor};
pub use http::ReqwestTransport;
pub use retry::RetryPolicy;
pub use types::*;
