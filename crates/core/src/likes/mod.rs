//! Like toggling: per-mutation state machine and the optimistic controller.

mod controller;
mod mutation;

pub use controller::{LikeError, LikeToggleController};
pub use mutation::{LikeMutation, MutationState};
