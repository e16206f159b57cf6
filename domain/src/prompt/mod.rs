//! Prompt domain
//!
//! Templates for participant turns (per [`ChatMode`](crate::ChatMode)) and
//! for the moderator synthesis of a round.

mod template;

pub use template::PromptTemplate;
