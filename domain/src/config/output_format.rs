//! Output format value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// How a finished round is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every message of the round, grouped by participant
    Full,
    /// Only the moderator synthesis plus failure markers (default)
    #[default]
    Summary,
    /// JSON output
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Full => "full",
            OutputFormat::Summary => "summary",
            OutputFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(OutputFormat::Full),
            "summary" | "synthesis" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            other => Err(DomainError::InvalidValue {
                field: "output.format",
                value: other.to_string(),
            }),
        }
    }
}
