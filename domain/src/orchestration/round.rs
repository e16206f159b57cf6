//! Round numbering derived from message history.
//!
//! [`current_round_number`] is the one function used for gating. It reads the
//! round tag of the latest message, so once an optimistic user message for a
//! new round is present, the gate targets that round and not the one after.

use crate::message::entities::Message;
use crate::message::identity::MessageSlot;

/// Round of the most recent message (0 for an empty thread).
pub fn current_round_number(messages: &[Message]) -> u32 {
    messages.iter().map(|m| m.round_number).max().unwrap_or(0)
}

/// Round a brand-new user message would open.
pub fn next_round_number(messages: &[Message]) -> u32 {
    messages
        .iter()
        .map(|m| m.round_number)
        .max()
        .map_or(0, |max| max + 1)
}

pub fn messages_in_round(messages: &[Message], round_number: u32) -> impl Iterator<Item = &Message> {
    messages.iter().filter(move |m| m.round_number == round_number)
}

pub fn find_slot(messages: &[Message], round_number: u32, slot: MessageSlot) -> Option<&Message> {
    messages
        .iter()
        .find(|m| m.round_number == round_number && m.slot() == slot)
}

pub fn user_message(messages: &[Message], round_number: u32) -> Option<&Message> {
    find_slot(messages, round_number, MessageSlot::User)
}

pub fn moderator_message(messages: &[Message], round_number: u32) -> Option<&Message> {
    find_slot(messages, round_number, MessageSlot::Moderator)
}

/// A round that has a user message but no assistant output yet.
pub fn is_round_unstarted(messages: &[Message], round_number: u32) -> bool {
    let mut in_round = messages_in_round(messages, round_number).peekable();
    in_round.peek().is_some() && in_round.all(|m| m.is_user())
}

/// Sort messages by round, then user / participants by index / moderator.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by_key(|m| (m.round_number, m.slot()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Model;

    fn user(round: u32) -> Message {
        Message::user(format!("t_r{}_user", round), round, "q")
    }

    #[test]
    fn empty_thread_is_round_zero() {
        assert_eq!(current_round_number(&[]), 0);
        assert_eq!(next_round_number(&[]), 0);
    }

    #[test]
    fn current_round_follows_latest_tag() {
        let messages = vec![
            user(0),
            Message::participant("t", 0, 0, "p0", Model::Gpt52),
            user(1),
        ];
        assert_eq!(current_round_number(&messages), 1);
        assert_eq!(next_round_number(&messages), 2);
    }

    #[test]
    fn optimistic_message_moves_current_round() {
        let mut messages = vec![user(0), Message::participant("t", 0, 0, "p0", Model::Gpt52)];
        assert_eq!(current_round_number(&messages), 0);
        messages.push(Message::optimistic_user(1, "next"));
        // Gating must use the round the optimistic message opened.
        assert_eq!(current_round_number(&messages), 1);
    }

    #[test]
    fn unstarted_round_detection() {
        let messages = vec![user(0)];
        assert!(is_round_unstarted(&messages, 0));
        assert!(!is_round_unstarted(&messages, 1));

        let messages = vec![user(0), Message::participant("t", 0, 0, "p0", Model::Gpt52)];
        assert!(!is_round_unstarted(&messages, 0));
    }

    #[test]
    fn sort_orders_slots_within_round() {
        let mut messages = vec![
            Message::moderator("t", 0, Model::ClaudeOpus45),
            Message::participant("t", 0, 1, "p1", Model::Gpt52),
            user(1),
            Message::participant("t", 0, 0, "p0", Model::Gpt52),
            user(0),
        ];
        sort_messages(&mut messages);
        let slots: Vec<_> = messages.iter().map(|m| (m.round_number, m.slot())).collect();
        assert_eq!(
            slots,
            vec![
                (0, MessageSlot::User),
                (0, MessageSlot::Participant(0)),
                (0, MessageSlot::Participant(1)),
                (0, MessageSlot::Moderator),
                (1, MessageSlot::User),
            ]
        );
    }
}
