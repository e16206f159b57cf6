//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for `*.conversation.jsonl` transcripts. Disabled when unset.
    pub conversation_dir: Option<PathBuf>,
    /// Diagnostic log file written through `tracing-appender`.
    pub file: Option<PathBuf>,
}
