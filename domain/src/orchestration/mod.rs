//! Round orchestration domain
//!
//! - [`round`]: the single authoritative "current round" derivation
//! - [`participants::ParticipantOrchestrator`]: strictly sequential
//!   participant pointer, context assembly and round completion

pub mod participants;
pub mod round;
