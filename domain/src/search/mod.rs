//! Pre-search domain.
//!
//! - [`entities::PreSearchRecord`]: one optional web search per round
//! - [`gate`]: whether participant streaming must wait for it

pub mod entities;
pub mod gate;
