//! Search: ranked remote search falling back to a local title match.

mod orchestrator;
mod types;

pub use orchestrator::SearchOrchestrator;
pub use types::*;
