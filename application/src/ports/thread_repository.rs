//! Persistence port
//!
//! The store shows optimistic state first; this port returns the
//! authoritative records that supersede it.

use async_trait::async_trait;
use roundtable_domain::{ChatMode, Message, Participant, Thread};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Create a thread for its first message.
    async fn create_thread(
        &self,
        mode: ChatMode,
        enable_web_search: bool,
        participants: &[Participant],
    ) -> Result<Thread, RepositoryError>;

    /// Persist the user message of a round; returns it under its canonical id.
    async fn save_user_message(
        &self,
        thread_id: &str,
        round_number: u32,
        text: &str,
    ) -> Result<Message, RepositoryError>;

    /// Persist a finished assistant message.
    async fn save_message(&self, message: &Message) -> Result<(), RepositoryError>;

    async fn load_message(&self, id: &str) -> Result<Option<Message>, RepositoryError>;

    /// Title and slug generated from the first message.
    async fn generate_title(
        &self,
        thread_id: &str,
        first_message: &str,
    ) -> Result<(String, String), RepositoryError>;
}
