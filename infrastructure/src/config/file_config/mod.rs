//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod council;
mod logging;
mod output;
mod timeouts;

pub use council::FileCouncilConfig;
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use timeouts::FileTimeoutsConfig;

use roundtable_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Participants, moderator and thread defaults
    pub council: FileCouncilConfig,
    /// Staleness thresholds
    pub timeouts: FileTimeoutsConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Conversation log and diagnostic log locations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks empty or duplicate model ids, an unknown chat mode and
    /// non-positive timeouts.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.council.parse_participants().1);
        issues.extend(self.council.parse_moderator().1);
        issues.extend(self.council.parse_mode().1);
        issues.extend(self.timeouts.to_policy().1);
        issues
    }
}
