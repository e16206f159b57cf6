//! Thread and participant entities

use crate::core::error::DomainError;
use crate::core::model::Model;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation mode of a thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Debating,
    Analyzing,
    Brainstorming,
    Solving,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Debating => "debating",
            ChatMode::Analyzing => "analyzing",
            ChatMode::Brainstorming => "brainstorming",
            ChatMode::Solving => "solving",
        }
    }
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debating" | "debate" => Ok(ChatMode::Debating),
            "analyzing" | "analysis" => Ok(ChatMode::Analyzing),
            "brainstorming" | "brainstorm" => Ok(ChatMode::Brainstorming),
            "solving" | "solve" => Ok(ChatMode::Solving),
            other => Err(DomainError::UnknownChatMode(other.to_string())),
        }
    }
}

/// Lifecycle status of a thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Active,
    Archived,
    Deleted,
}

/// A conversation (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub mode: ChatMode,
    pub enable_web_search: bool,
    pub status: ThreadStatus,
    /// Set once the generated title replaced the placeholder one.
    pub is_ai_generated_title: bool,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: impl Into<String>, mode: ChatMode) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            title: "New conversation".to_string(),
            id,
            mode,
            enable_web_search: false,
            status: ThreadStatus::Active,
            is_ai_generated_title: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.enable_web_search = enabled;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>, slug: impl Into<String>) -> Self {
        self.title = title.into();
        self.slug = slug.into();
        self.is_ai_generated_title = true;
        self
    }
}

/// One configured model slot in a thread (Entity)
///
/// `priority` is the zero-based position in the speaking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub model: Model,
    /// Optional role prompt ("The Skeptic", ...)
    pub role: Option<String>,
    pub priority: usize,
    pub is_enabled: bool,
}

impl Participant {
    pub fn new(id: impl Into<String>, model: Model, priority: usize) -> Self {
        Self {
            id: id.into(),
            model,
            role: None,
            priority,
            is_enabled: true,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    /// Build a roster from models in speaking order.
    pub fn roster(models: &[Model]) -> Vec<Participant> {
        models
            .iter()
            .enumerate()
            .map(|(i, model)| Participant::new(format!("participant-{}", i), model.clone(), i))
            .collect()
    }
}

/// Sort by priority and renumber priorities to `0..n`.
pub fn normalize_priorities(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by_key(|p| p.priority);
    for (i, p) in participants.iter_mut().enumerate() {
        p.priority = i;
    }
    participants
}

/// Enabled participants in speaking order. Participant indices used by
/// messages refer to positions in this list.
pub fn enabled_participants(participants: &[Participant]) -> Vec<&Participant> {
    let mut enabled: Vec<&Participant> = participants.iter().filter(|p| p.is_enabled).collect();
    enabled.sort_by_key(|p| p.priority);
    enabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_mode_parse() {
        assert_eq!("debate".parse::<ChatMode>().unwrap(), ChatMode::Debating);
        assert_eq!("Analyzing".parse::<ChatMode>().unwrap(), ChatMode::Analyzing);
        assert!("poetry".parse::<ChatMode>().is_err());
    }

    #[test]
    fn test_normalize_priorities() {
        let participants = vec![
            Participant::new("b", Model::Gpt52, 7),
            Participant::new("a", Model::ClaudeSonnet45, 3),
        ];
        let normalized = normalize_priorities(participants);
        assert_eq!(normalized[0].id, "a");
        assert_eq!(normalized[0].priority, 0);
        assert_eq!(normalized[1].id, "b");
        assert_eq!(normalized[1].priority, 1);
    }

    #[test]
    fn test_enabled_participants_skips_disabled() {
        let participants = vec![
            Participant::new("a", Model::ClaudeSonnet45, 0),
            Participant::new("b", Model::Gpt52, 1).disabled(),
            Participant::new("c", Model::Gemini3Pro, 2),
        ];
        let enabled = enabled_participants(&participants);
        let ids: Vec<_> = enabled.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_roster_assigns_priorities() {
        let roster = Participant::roster(&Model::default_participants());
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[2].priority, 2);
        assert!(roster.iter().all(|p| p.is_enabled));
    }
}
