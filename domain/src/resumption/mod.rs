//! Stream resumption domain.
//!
//! After a reload, a participant stream may still be running (or may have
//! just finished) on the server. [`entities::StreamResumptionRecord`]
//! describes it; [`entities::evaluate`] decides what to do about it.

pub mod entities;
