//! Message list maintenance and optimistic reconciliation.

use super::{ChatStore, StoreError};
use roundtable_domain::Message;
use roundtable_domain::orchestration::participants::{assemble_context, is_round_complete};
use roundtable_domain::orchestration::round::{messages_in_round, next_round_number, sort_messages};
use tracing::debug;

/// Insert or replace. An entry with the same id, or the same
/// `(round, slot)`, is superseded rather than duplicated.
pub(crate) fn insert_message(messages: &mut Vec<Message>, message: Message) {
    let slot = message.slot();
    messages.retain(|m| {
        m.id != message.id && !(m.round_number == message.round_number && m.slot() == slot)
    });
    messages.push(message);
    sort_messages(messages);
}

impl ChatStore {
    /// Idempotent insert.
    pub fn upsert_message(&mut self, message: Message) {
        self.apply("upsert_message", |s| insert_message(&mut s.messages, message));
    }

    /// Replace the whole list (authoritative history).
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.apply("set_messages", |s| {
            s.messages.clear();
            for message in messages {
                insert_message(&mut s.messages, message);
            }
        });
    }

    /// Correct a temporary id to its canonical one. If the canonical entry
    /// already arrived, the temporary one is dropped.
    pub fn rename_message(&mut self, old_id: &str, new_id: &str) -> Result<(), StoreError> {
        self.commit("rename_message", |s| {
            let canonical_exists = s.messages.iter().any(|m| m.id == new_id);
            let Some(pos) = s.messages.iter().position(|m| m.id == old_id) else {
                return if canonical_exists {
                    Ok(())
                } else {
                    Err(StoreError::MessageNotFound(old_id.to_string()))
                };
            };
            if canonical_exists {
                s.messages.remove(pos);
            } else {
                let message = &mut s.messages[pos];
                message.id = new_id.to_string();
                message.is_optimistic = false;
            }
            Ok(())
        })
    }

    /// The persisted user message arrived: it supersedes the optimistic one
    /// for its round and ends the changelog wait. A staged round older than
    /// the confirmed one moves forward to it.
    pub fn confirm_user_message(&mut self, mut message: Message) -> Result<(), StoreError> {
        self.commit("confirm_user_message", |s| {
            if !message.is_user() {
                return Err(StoreError::NotUserMessage(message.id.clone()));
            }
            let staged = s.pending_message.is_some() && !s.is_round_in_progress();
            if staged
                && s
                    .streaming_round_number
                    .is_some_and(|round| round < message.round_number)
            {
                debug!(round_number = message.round_number, "Restaged to confirmed round");
                s.streaming_round_number = Some(message.round_number);
            }
            message.is_optimistic = false;
            insert_message(&mut s.messages, message);
            s.is_waiting_for_changelog = false;
            Ok(())
        })
    }

    pub fn remove_optimistic_messages(&mut self) {
        self.apply("remove_optimistic_messages", |s| {
            s.messages.retain(|m| !m.is_optimistic)
        });
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.state.messages.iter().find(|m| m.id == id)
    }

    pub fn messages_in_round(&self, round_number: u32) -> Vec<&Message> {
        messages_in_round(&self.state.messages, round_number).collect()
    }

    /// Context handed to participant `index`.
    pub fn participant_context(&self, round_number: u32, index: usize) -> Vec<&Message> {
        assemble_context(&self.state.messages, round_number, index)
    }

    pub fn current_round_number(&self) -> u32 {
        self.state.current_round_number()
    }

    pub fn next_round_number(&self) -> u32 {
        next_round_number(&self.state.messages)
    }

    /// Every enabled participant has a terminal message for the round.
    pub fn is_round_complete(&self, round_number: u32) -> bool {
        is_round_complete(
            &self.state.messages,
            round_number,
            self.state.participant_count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use roundtable_domain::{FinishReason, MessageSlot, Model};

    #[test]
    fn upsert_never_duplicates_a_slot() {
        let mut store = store_with(2);
        for message in completed_round(0, 2) {
            store.upsert_message(message);
        }
        let again = Message::participant(THREAD, 0, 1, "p1", Model::Gpt52)
            .with_text("revised")
            .with_finish_reason(FinishReason::Stop);
        store.upsert_message(again);

        let round = store.messages_in_round(0);
        assert_eq!(round.len(), 3);
        assert_eq!(round.iter().filter(|m| m.is_user()).count(), 1);
        assert_eq!(round[2].text(), "revised");
    }

    #[test]
    fn temporary_participant_id_is_replaced_by_canonical() {
        let mut store = store_with(1);
        let mut temp = Message::participant(THREAD, 0, 0, "p0", Model::Gpt52);
        temp.id = "tmp-123".to_string();
        store.upsert_message(temp);

        let canonical = Message::participant(THREAD, 0, 0, "p0", Model::Gpt52).with_text("final");
        store.upsert_message(canonical);

        assert_eq!(store.state().messages.len(), 1);
        assert_eq!(store.state().messages[0].id, "thread-a_r0_p0");
    }

    #[test]
    fn rename_drops_temporary_when_canonical_present() {
        let mut store = store_with(1);
        let mut temp = Message::participant(THREAD, 1, 0, "p0", Model::Gpt52);
        temp.id = "tmp".to_string();
        store.state.messages.push(temp);
        store
            .state
            .messages
            .push(Message::participant(THREAD, 1, 0, "p0", Model::Gpt52));

        store.rename_message("tmp", "thread-a_r1_p0").unwrap();
        assert_eq!(store.state().messages.len(), 1);
        assert_eq!(store.state().messages[0].id, "thread-a_r1_p0");
    }

    #[test]
    fn rename_unknown_message_fails() {
        let mut store = store_with(1);
        assert_eq!(
            store.rename_message("nope", "thread-a_r0_p0"),
            Err(StoreError::MessageNotFound("nope".to_string()))
        );
    }

    #[test]
    fn confirm_replaces_optimistic_and_ends_changelog_wait() {
        let mut store = store_with(2);
        store.prepare_for_new_message("what is rust?", true).unwrap();
        assert!(store.state().is_waiting_for_changelog);

        store
            .confirm_user_message(Message::user("thread-a_r0_user", 0, "what is rust?"))
            .unwrap();

        let users: Vec<_> = store.state().messages.iter().filter(|m| m.is_user()).collect();
        assert_eq!(users.len(), 1);
        assert!(!users[0].is_optimistic);
        assert!(!store.state().is_waiting_for_changelog);
    }

    #[test]
    fn confirm_rejects_assistant_message() {
        let mut store = store_with(1);
        let message = Message::participant(THREAD, 0, 0, "p0", Model::Gpt52);
        assert!(matches!(
            store.confirm_user_message(message),
            Err(StoreError::NotUserMessage(_))
        ));
    }

    #[test]
    fn context_for_next_participant_includes_only_earlier_ones() {
        let mut store = store_with(3);
        store.set_messages(completed_round(0, 3));

        let context = store.participant_context(0, 2);
        let slots: Vec<_> = context.iter().map(|m| m.slot()).collect();
        assert_eq!(
            slots,
            vec![
                MessageSlot::User,
                MessageSlot::Participant(0),
                MessageSlot::Participant(1)
            ]
        );
    }

    #[test]
    fn round_complete_counts_enabled_participants_only() {
        let mut store = store_with(2);
        store.set_messages(completed_round(0, 2));
        assert!(store.is_round_complete(0));
        assert_eq!(store.next_round_number(), 1);
        assert_eq!(store.current_round_number(), 0);
    }
}
