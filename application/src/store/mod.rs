//! Central store for the loaded thread.
//!
//! [`ChatStore`] is the single mutable container the UI and network layers
//! talk to. Every public mutation is one atomic transition: fallible
//! operations run against a copy of the state and only replace it on
//! success, so a rejected call never leaves a half-applied state behind.
//!
//! Operations are grouped by concern:
//!
//! | File | Concern |
//! |------|---------|
//! | `thread.rs` | initialize / reset / roster / mode |
//! | `messages.rs` | idempotent insert, optimistic reconciliation, context |
//! | `streaming.rs` | prepare, participant streaming, stop / complete, regeneration |
//! | `pre_search.rs` | pre-search records, gate, staleness sweep |
//! | `moderator.rs` | analysis records and moderator streaming |
//! | `resumption.rs` | stream resumption after reload |
//! | `flow.rs` | flow machine snapshot |

mod flow;
mod messages;
mod moderator;
mod pre_search;
mod resumption;
mod state;
mod streaming;
mod thread;

pub use state::StoreState;

use roundtable_domain::{DomainError, StalenessPolicy};
use thiserror::Error;
use tracing::debug;

/// Rejected store transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No thread is loaded")]
    NoThread,

    #[error("A round is in progress")]
    RoundInProgress,

    #[error("Not streaming")]
    NotStreaming,

    #[error("Participant {got} cannot stream; current participant is {expected}")]
    UnexpectedParticipant { expected: usize, got: usize },

    #[error("Round {got} is not the streaming round ({expected:?})")]
    UnexpectedRound { expected: Option<u32>, got: u32 },

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Not a user message: {0}")]
    NotUserMessage(String),

    #[error("No pending message to send")]
    NoPendingMessage,

    #[error("Round {0} is not the latest round")]
    NotLatestRound(u32),

    #[error("Round {0} already has every participant answer")]
    RoundAlreadyComplete(u32),

    #[error("No analysis for round {0}")]
    AnalysisNotFound(u32),

    #[error("No pre-search for round {0}")]
    PreSearchNotFound(u32),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What happened when a participant finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStep {
    /// Start this participant next; the index is already committed.
    Next(usize),
    /// All participants are terminal; moderator is now eligible.
    RoundComplete,
    /// Streaming was stopped before this arrived; nothing changed.
    Ignored,
}

impl ParticipantStep {
    pub fn next_index(&self) -> Option<usize> {
        match self {
            ParticipantStep::Next(index) => Some(*index),
            _ => None,
        }
    }
}

/// The store
#[derive(Debug, Clone, Default)]
pub struct ChatStore {
    state: StoreState,
    policy: StalenessPolicy,
    version: u64,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: StalenessPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    /// Number of committed transitions that changed the state.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn current_participant_index(&self) -> usize {
        self.state.current_participant_index()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming
    }

    /// Run `f` against a copy of the state; commit only if it succeeds.
    fn commit<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut next = self.state.clone();
        let out = f(&mut next)?;
        self.replace(op, next);
        Ok(out)
    }

    /// Infallible transition.
    fn apply<T>(&mut self, op: &'static str, f: impl FnOnce(&mut StoreState) -> T) -> T {
        let mut next = self.state.clone();
        let out = f(&mut next);
        self.replace(op, next);
        out
    }

    fn replace(&mut self, op: &'static str, next: StoreState) {
        if next != self.state {
            self.state = next;
            self.version += 1;
            debug!(op, version = self.version, "store transition");
        }
    }

    // ==================== Global error ====================

    pub fn set_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.apply("set_error", |s| s.error = Some(error));
    }

    pub fn clear_error(&mut self) {
        self.apply("clear_error", |s| s.error = None);
    }

    // ==================== Entrance animations ====================

    pub fn register_animation(&mut self, participant_index: usize) {
        self.apply("register_animation", |s| {
            s.pending_animations.insert(participant_index);
        });
    }

    pub fn complete_animation(&mut self, participant_index: usize) {
        self.apply("complete_animation", |s| {
            s.pending_animations.remove(&participant_index);
        });
    }

    pub fn clear_animations(&mut self) {
        self.apply("clear_animations", |s| s.pending_animations.clear());
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn failed_commit_leaves_state_untouched() {
        let mut store = store_with(2);
        let before = store.state().clone();
        let version = store.version();

        let result = store.commit("test", |s| {
            s.is_streaming = true;
            Err::<(), _>(StoreError::NotStreaming)
        });

        assert!(result.is_err());
        assert_eq!(store.state(), &before);
        assert_eq!(store.version(), version);
    }

    #[test]
    fn no_op_commit_does_not_bump_version() {
        let mut store = store_with(2);
        let version = store.version();
        store.commit("noop", |_| Ok(())).unwrap();
        assert_eq!(store.version(), version);
    }

    #[test]
    fn error_is_independently_clearable() {
        let mut store = store_with(1);
        store.set_error("connection lost");
        assert_eq!(store.state().error.as_deref(), Some("connection lost"));
        store.clear_error();
        assert!(store.state().error.is_none());
    }

    #[test]
    fn animations_track_by_index() {
        let mut store = store_with(2);
        store.register_animation(0);
        store.register_animation(1);
        store.complete_animation(0);
        assert_eq!(store.state().pending_animations.len(), 1);
        store.clear_animations();
        assert!(store.state().pending_animations.is_empty());
    }
}
