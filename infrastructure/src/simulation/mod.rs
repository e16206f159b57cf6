//! In-process collaborators
//!
//! Offline implementations of every application port, so the binary can
//! run complete rounds (including failures and stream resumption) without
//! network access.

mod registry;
mod repository;
mod search;
mod streamer;

pub use registry::InMemoryStreamRegistry;
pub use repository::InMemoryThreadRepository;
pub use search::StaticSearchProvider;
pub use streamer::SimulatedParticipantStreamer;
