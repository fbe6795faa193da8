use serde::{Deserialize, Serialize};

use crate::catalog::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Pending,
    Confirmed,
    RolledBack,
}

/// One optimistic like change: `Pending` until the remote settles it as
/// `Confirmed` or `RolledBack`. Settled mutations never change again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeMutation {
    pub record_id: RecordId,
    pub previous: bool,
    pub target: bool,
    state: MutationState,
}

impl LikeMutation {
    pub fn begin(record_id: RecordId, previous: bool, target: bool) -> Self {
        Self {
            record_id,
            previous,
            target,
            state: MutationState::Pending,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Target already matches the current value; nothing to send.
    pub fn is_noop(&self) -> bool {
        self.previous == self.target
    }

    /// Returns false if the mutation was already settled.
    pub fn confirm(&mut self) -> bool {
        self.settle(MutationState::Confirmed)
    }

    /// Returns false if the mutation was already settled.
    pub fn roll_back(&mut self) -> bool {
        self.settle(MutationState::RolledBack)
    }

    /// The value the stores should hold for this mutation's current state.
    pub fn effective_value(&self) -> bool {
        match self.state {
            MutationState::RolledBack => self.previous,
            MutationState::Pending | MutationState::Confirmed => self.target,
        }
    }

    fn settle(&mut self, next: MutationState) -> bool {
        if self.state != MutationState::Pending {
            return false;
        }
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_keeps_target() {
        let mut m = LikeMutation::begin(1, false, true);
        assert_eq!(m.state(), MutationState::Pending);
        assert!(m.effective_value());

        assert!(m.confirm());
        assert_eq!(m.state(), MutationState::Confirmed);
        assert!(m.effective_value());
    }

    #[test]
    fn test_roll_back_restores_previous() {
        let mut m = LikeMutation::begin(1, true, false);
        assert!(m.roll_back());
        assert!(m.effective_value());
    }

    #[test]
    fn test_settled_is_final() {
        let mut m = LikeMutation::begin(1, false, true);
        assert!(m.roll_back());
        assert!(!m.confirm());
        assert_eq!(m.state(), MutationState::RolledBack);
    }

    #[test]
    fn test_noop() {
        assert!(LikeMutation::begin(1, true, true).is_noop());
        assert!(!LikeMutation::begin(1, true, false).is_noop());
    }
}
