//! Status vocabulary shared by pre-search and analysis records.

use serde::{Deserialize, Serialize};

/// Lifecycle of a per-round record: `pending → streaming → complete | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Streaming,
    Complete,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Streaming => "streaming",
            RecordStatus::Complete => "complete",
            RecordStatus::Failed => "failed",
        }
    }

    /// `complete` or `failed`: the record will not change on its own any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Complete | RecordStatus::Failed)
    }

    /// `pending` or `streaming`.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
