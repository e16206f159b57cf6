//! Message entities
//!
//! A [`Message`] carries its role-specific payload in [`MessageKind`], so a
//! moderator message can never also claim a participant index.

use super::error::{ErrorCategory, MessageError};
use super::identity::{MessageKey, MessageSlot};
use crate::core::model::Model;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat role as seen by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Role-specific payload of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Participant {
        participant_index: usize,
        participant_id: String,
        model: Model,
    },
    Moderator {
        model: Model,
    },
}

/// One content part of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    Reasoning { text: String },
}

/// Completion signal carried by an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content-filter",
            FinishReason::Error => "error",
            FinishReason::Other(s) => s,
        }
    }
}

/// A message in a round (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub kind: MessageKind,
    pub parts: Vec<MessagePart>,
    pub round_number: u32,
    pub finish_reason: Option<FinishReason>,
    pub error: Option<MessageError>,
    /// Client-predicted entry awaiting the authoritative record.
    pub is_optimistic: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn base(id: String, kind: MessageKind, round_number: u32) -> Self {
        Self {
            id,
            kind,
            parts: Vec::new(),
            round_number,
            finish_reason: None,
            error: None,
            is_optimistic: false,
            created_at: Utc::now(),
        }
    }

    pub fn user(id: impl Into<String>, round_number: u32, text: impl Into<String>) -> Self {
        let mut message = Self::base(id.into(), MessageKind::User, round_number);
        message.parts.push(MessagePart::Text { text: text.into() });
        message
    }

    /// Optimistic user message under a temporary id.
    pub fn optimistic_user(round_number: u32, text: impl Into<String>) -> Self {
        let now = Utc::now();
        let id = format!(
            "optimistic-r{}-{}",
            round_number,
            now.timestamp_nanos_opt().unwrap_or_default()
        );
        let mut message = Self::user(id, round_number, text);
        message.is_optimistic = true;
        message.created_at = now;
        message
    }

    /// Empty participant message under its canonical id.
    pub fn participant(
        thread_id: &str,
        round_number: u32,
        participant_index: usize,
        participant_id: impl Into<String>,
        model: Model,
    ) -> Self {
        let key = MessageKey::new(
            thread_id,
            round_number,
            MessageSlot::Participant(participant_index),
        );
        Self::base(
            key.to_string(),
            MessageKind::Participant {
                participant_index,
                participant_id: participant_id.into(),
                model,
            },
            round_number,
        )
    }

    /// Empty moderator message under its canonical id.
    pub fn moderator(thread_id: &str, round_number: u32, model: Model) -> Self {
        let key = MessageKey::new(thread_id, round_number, MessageSlot::Moderator);
        Self::base(
            key.to_string(),
            MessageKind::Moderator { model },
            round_number,
        )
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(MessagePart::Text { text: text.into() });
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn with_error(mut self, category: ErrorCategory, message: impl Into<String>) -> Self {
        self.error = Some(MessageError::new(category, message));
        self.finish_reason.get_or_insert(FinishReason::Error);
        self
    }

    pub fn role(&self) -> Role {
        match self.kind {
            MessageKind::User => Role::User,
            _ => Role::Assistant,
        }
    }

    pub fn slot(&self) -> MessageSlot {
        match &self.kind {
            MessageKind::User => MessageSlot::User,
            MessageKind::Participant {
                participant_index, ..
            } => MessageSlot::Participant(*participant_index),
            MessageKind::Moderator { .. } => MessageSlot::Moderator,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, MessageKind::User)
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self.kind, MessageKind::Moderator { .. })
    }

    pub fn participant_index(&self) -> Option<usize> {
        match &self.kind {
            MessageKind::Participant {
                participant_index, ..
            } => Some(*participant_index),
            _ => None,
        }
    }

    pub fn model(&self) -> Option<&Model> {
        match &self.kind {
            MessageKind::User => None,
            MessageKind::Participant { model, .. } | MessageKind::Moderator { model } => {
                Some(model)
            }
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// A message is terminal once it carries a finish reason or an error tag.
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some() || self.error.is_some()
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::Reasoning { .. } => None,
            })
            .collect()
    }

    pub fn has_text(&self) -> bool {
        self.parts.iter().any(|part| match part {
            MessagePart::Text { text } => !text.trim().is_empty(),
            MessagePart::Reasoning { .. } => false,
        })
    }

    /// Append a streamed text chunk, extending the trailing text part.
    pub fn push_text(&mut self, chunk: &str) {
        if let Some(MessagePart::Text { text }) = self.parts.last_mut() {
            text.push_str(chunk);
        } else {
            self.parts.push(MessagePart::Text {
                text: chunk.to_string(),
            });
        }
    }

    /// Append a streamed reasoning chunk.
    pub fn push_reasoning(&mut self, chunk: &str) {
        if let Some(MessagePart::Reasoning { text }) = self.parts.last_mut() {
            text.push_str(chunk);
        } else {
            self.parts.push(MessagePart::Reasoning {
                text: chunk.to_string(),
            });
        }
    }

    /// Mark the message terminal. An assistant message that finished
    /// without any text and without a reason is tagged `silent_failure`.
    pub fn finish(&mut self, reason: Option<FinishReason>) {
        match reason {
            Some(reason) => self.finish_reason = Some(reason),
            None if !self.has_text() && self.error.is_none() => {
                self.error = Some(MessageError::from_category(ErrorCategory::SilentFailure));
                self.finish_reason = Some(FinishReason::Error);
            }
            None => {
                self.finish_reason.get_or_insert(FinishReason::Stop);
            }
        }
    }

    /// Mark the message failed with the given error.
    pub fn fail(&mut self, error: MessageError) {
        self.error = Some(error);
        self.finish_reason = Some(FinishReason::Error);
    }
}
