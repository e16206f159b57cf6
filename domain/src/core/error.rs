//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("No participants configured for this thread")]
    NoParticipants,

    #[error("Invalid message id: {0}")]
    InvalidMessageId(String),

    #[error("Unknown chat mode: {0}")]
    UnknownChatMode(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Unknown error category: {0}")]
    UnknownErrorCategory(String),

    #[error("Participant index {index} out of range (participants: {count})")]
    ParticipantOutOfRange { index: usize, count: usize },

    #[error("Participant {index} has not produced a terminal message in round {round_number}")]
    ParticipantNotTerminal { round_number: u32, index: usize },

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
