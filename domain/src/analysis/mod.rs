//! Analysis (moderator) records.

pub mod entities;
