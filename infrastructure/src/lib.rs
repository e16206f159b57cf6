//! Infrastructure layer for roundtable
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod simulation;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileCouncilConfig, FileLoggingConfig, FileOutputConfig,
    FileOutputFormat, FileTimeoutsConfig,
};
pub use logging::JsonlConversationLogger;
pub use simulation::{
    InMemoryStreamRegistry, InMemoryThreadRepository, SimulatedParticipantStreamer,
    StaticSearchProvider,
};
