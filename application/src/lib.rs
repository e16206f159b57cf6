//! Application layer for roundtable
//!
//! This crate contains the chat store, use cases, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod store;
pub mod use_cases;

// Re-export commonly used types
pub use config::RoundParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    navigator::{Navigator, NoNavigation},
    participant_stream::{
        GatewayError, ModeratorRequest, ParticipantRequest, ParticipantStreamPort, StreamHandle,
    },
    progress::{NoProgress, RoundProgressNotifier},
    resumable_stream::{ResumableStreamPort, StreamStatus},
    thread_repository::{RepositoryError, ThreadRepository},
    web_search::{SearchError, WebSearchPort},
};
pub use store::{ChatStore, ParticipantStep, StoreError, StoreState};
pub use use_cases::resume_stream::{ResumeOutcome, ResumeStreamError, ResumeStreamUseCase};
pub use use_cases::run_round::{RoundOutcome, RunRoundError, RunRoundUseCase};
