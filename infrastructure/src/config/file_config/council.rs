//! Council configuration from TOML (`[council]` section)

use roundtable_domain::{ChatMode, ConfigIssue, ConfigIssueCode, Model};
use serde::{Deserialize, Serialize};

/// Who answers and who synthesizes
///
/// # Example
///
/// ```toml
/// [council]
/// participants = ["claude-sonnet-4.5", "gpt-5.2", "gemini-3-pro-preview"]
/// moderator = "claude-opus-4.5"
/// mode = "debating"
/// web_search = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    /// Participant model ids in priority order
    pub participants: Vec<String>,
    /// Moderator model id
    pub moderator: Option<String>,
    /// Chat mode for new threads
    pub mode: Option<String>,
    /// Enable web search for new threads
    pub web_search: bool,
}

impl FileCouncilConfig {
    /// Parse participant ids. Empty names are reported and skipped;
    /// duplicates are reported but kept.
    pub fn parse_participants(&self) -> (Vec<Model>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut models: Vec<Model> = Vec::new();
        for s in &self.participants {
            if s.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyModelName {
                        field: "participants".to_string(),
                    },
                    "council.participants: model name cannot be empty in list",
                ));
                continue;
            }
            let Ok(model) = s.trim().parse::<Model>();
            if models.contains(&model) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateParticipant {
                        model: model.to_string(),
                    },
                    format!("council.participants: '{}' is listed more than once", model),
                ));
            }
            models.push(model);
        }
        (models, issues)
    }

    pub fn parse_moderator(&self) -> (Option<Model>, Vec<ConfigIssue>) {
        match self.moderator.as_deref() {
            None => (None, Vec::new()),
            Some(s) if s.trim().is_empty() => (
                None,
                vec![ConfigIssue::error(
                    ConfigIssueCode::EmptyModelName {
                        field: "moderator".to_string(),
                    },
                    "council.moderator: model name cannot be empty",
                )],
            ),
            Some(s) => {
                let Ok(model) = s.trim().parse::<Model>();
                (Some(model), Vec::new())
            }
        }
    }

    pub fn parse_mode(&self) -> (Option<ChatMode>, Vec<ConfigIssue>) {
        match self.mode.as_deref() {
            None => (None, Vec::new()),
            Some(s) => match s.parse::<ChatMode>() {
                Ok(mode) => (Some(mode), Vec::new()),
                Err(_) => (
                    None,
                    vec![ConfigIssue::warning(
                        ConfigIssueCode::InvalidEnumValue {
                            field: "council.mode".to_string(),
                            value: s.to_string(),
                            valid_values: ["debating", "analyzing", "brainstorming", "solving"]
                                .iter()
                                .map(|v| v.to_string())
                                .collect(),
                        },
                        format!(
                            "council.mode: unknown value '{}', falling back to 'debating'",
                            s
                        ),
                    )],
                ),
            },
        }
    }
}
