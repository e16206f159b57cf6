//! Streaming events for participant and moderator responses.

mod event;

pub use event::StreamEvent;
