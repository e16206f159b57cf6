//! Thread domain.
//!
//! - [`entities::Thread`]: one conversation, created on first submission
//! - [`entities::Participant`]: an ordered model slot within a thread
//! - [`entities::ChatMode`]: how the participants are asked to respond

pub mod entities;
