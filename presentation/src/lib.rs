//! Presentation layer for roundtable
//!
//! This crate contains CLI definitions, output formatters
//! and progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Mode, OutputFormat};
pub use output::{ConsoleFormatter, ConsoleNavigator, OutputFormatter, RoundView};
pub use progress::{InterruptAfterFirstChunk, ProgressReporter, SimpleProgress};
