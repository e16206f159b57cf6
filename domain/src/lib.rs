//! Domain layer for roundtable
//!
//! This crate contains the round data model and the pure decision logic that
//! sits between "user submitted a message" and "round is complete". It has no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Round
//!
//! One user message, then every enabled participant answering in priority
//! order (each seeing the earlier answers), then a moderator synthesis.
//!
//! ## Gates and guards
//!
//! - **Pre-search gate**: participants wait for an optional web search
//! - **Dedup guards**: per-round "at most once" markers for every trigger
//! - **Flow machine**: a pure state function plus edge-only actions

pub mod analysis;
pub mod config;
pub mod core;
pub mod flow;
pub mod guards;
pub mod message;
pub mod orchestration;
pub mod prompt;
pub mod resumption;
pub mod search;
pub mod stream;
pub mod thread;

// Re-export commonly used types
pub use analysis::entities::{AnalysisPayload, AnalysisRecord};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use crate::core::{
    error::DomainError,
    model::Model,
    staleness::StalenessPolicy,
    status::RecordStatus,
};
pub use flow::{FlowAction, FlowContext, FlowMachine, FlowState, ScreenMode};
pub use guards::{DedupGuards, OnceSet};
pub use message::{
    entities::{FinishReason, Message, MessageKind, MessagePart, Role},
    error::{ErrorCategory, MessageError},
    identity::{MessageKey, MessageSlot},
};
pub use orchestration::participants::{Advance, ParticipantOrchestrator};
pub use prompt::PromptTemplate;
pub use resumption::entities::{
    InvalidReason, ResumptionVerdict, StreamResumptionRecord, StreamState,
};
pub use search::{
    entities::{PreSearchPayload, PreSearchRecord, SearchResult},
    gate::{GateDecision, should_wait_for_pre_search},
};
pub use stream::StreamEvent;
pub use thread::entities::{ChatMode, Participant, Thread, ThreadStatus};
