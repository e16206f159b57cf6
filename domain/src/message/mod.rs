//! Message domain.
//!
//! - [`entities::Message`]: one user, participant or moderator message in a round
//! - [`identity`]: deterministic `{thread}_r{round}_p{index}` keys
//! - [`error::ErrorCategory`]: failure vocabulary attached to messages

pub mod entities;
pub mod error;
pub mod identity;
