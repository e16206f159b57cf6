//! Deterministic message and stream identities.
//!
//! ```text
//! {thread_id}_r{round}_user
//! {thread_id}_r{round}_p{participant_index}
//! {thread_id}_r{round}_moderator
//! ```
//!
//! A buffered network stream uses the same key as the message it produces.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Which position inside a round a message occupies.
///
/// Orders as user, participants by index, moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSlot {
    User,
    Participant(usize),
    Moderator,
}

impl MessageSlot {
    fn suffix(&self) -> String {
        match self {
            MessageSlot::User => "user".to_string(),
            MessageSlot::Participant(index) => format!("p{}", index),
            MessageSlot::Moderator => "moderator".to_string(),
        }
    }
}

/// A parsed canonical message identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub thread_id: String,
    pub round_number: u32,
    pub slot: MessageSlot,
}

impl MessageKey {
    pub fn new(thread_id: impl Into<String>, round_number: u32, slot: MessageSlot) -> Self {
        Self {
            thread_id: thread_id.into(),
            round_number,
            slot,
        }
    }

    /// Parse `{thread}_r{round}_{slot}`. Thread ids may themselves contain
    /// underscores, so the key is parsed from the right.
    pub fn parse(id: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidMessageId(id.to_string());

        let (head, slot_part) = id.rsplit_once('_').ok_or_else(invalid)?;
        let slot = match slot_part {
            "user" => MessageSlot::User,
            "moderator" => MessageSlot::Moderator,
            p if p.starts_with('p') => {
                let index = p[1..].parse::<usize>().map_err(|_| invalid())?;
                MessageSlot::Participant(index)
            }
            _ => return Err(invalid()),
        };

        let (thread_id, round_part) = head.rsplit_once("_r").ok_or_else(invalid)?;
        if thread_id.is_empty() {
            return Err(invalid());
        }
        let round_number = round_part.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self::new(thread_id, round_number, slot))
    }
}

impl std::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_r{}_{}",
            self.thread_id,
            self.round_number,
            self.slot.suffix()
        )
    }
}

pub fn user_message_id(thread_id: &str, round_number: u32) -> String {
    MessageKey::new(thread_id, round_number, MessageSlot::User).to_string()
}

pub fn participant_message_id(thread_id: &str, round_number: u32, index: usize) -> String {
    MessageKey::new(thread_id, round_number, MessageSlot::Participant(index)).to_string()
}

pub fn moderator_message_id(thread_id: &str, round_number: u32) -> String {
    MessageKey::new(thread_id, round_number, MessageSlot::Moderator).to_string()
}

/// Stream ids share the participant message key.
pub fn stream_id(thread_id: &str, round_number: u32, index: usize) -> String {
    participant_message_id(thread_id, round_number, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_format() {
        assert_eq!(participant_message_id("thread-1", 2, 0), "thread-1_r2_p0");
        assert_eq!(moderator_message_id("thread-1", 2), "thread-1_r2_moderator");
        assert_eq!(user_message_id("thread-1", 0), "thread-1_r0_user");
    }

    #[test]
    fn test_parse_participant_key() {
        let key = MessageKey::parse("abc_r3_p1").unwrap();
        assert_eq!(key.thread_id, "abc");
        assert_eq!(key.round_number, 3);
        assert_eq!(key.slot, MessageSlot::Participant(1));
    }

    #[test]
    fn test_parse_thread_with_underscores() {
        let key = MessageKey::parse("my_thread_r10_moderator").unwrap();
        assert_eq!(key.thread_id, "my_thread");
        assert_eq!(key.round_number, 10);
        assert_eq!(key.slot, MessageSlot::Moderator);
        assert_eq!(key.to_string(), "my_thread_r10_moderator");
    }

    #[test]
    fn test_parse_rejects_temporary_ids() {
        assert!(MessageKey::parse("optimistic-1700000000").is_err());
        assert!(MessageKey::parse("abc_rX_p1").is_err());
        assert!(MessageKey::parse("abc_r1_px").is_err());
        assert!(MessageKey::parse("_r1_user").is_err());
    }

    #[test]
    fn test_slot_ordering() {
        let mut slots = vec![
            MessageSlot::Moderator,
            MessageSlot::Participant(1),
            MessageSlot::User,
            MessageSlot::Participant(0),
        ];
        slots.sort();
        assert_eq!(
            slots,
            vec![
                MessageSlot::User,
                MessageSlot::Participant(0),
                MessageSlot::Participant(1),
                MessageSlot::Moderator,
            ]
        );
    }
}
