//! Progress reporting

pub mod interrupt;
pub mod reporter;

pub use interrupt::InterruptAfterFirstChunk;
pub use reporter::{ProgressReporter, SimpleProgress};
