//! Application-level configuration.
//!
//! - [`RoundParams`]: round driver control (moderator model, gate polling, stream timeouts)

pub mod round_params;

pub use round_params::RoundParams;
