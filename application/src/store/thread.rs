//! Thread lifecycle: initialize, roster and mode edits, resets.

use super::messages::insert_message;
use super::{ChatStore, StoreError, StoreState};
use roundtable_domain::thread::entities::normalize_priorities;
use roundtable_domain::{ChatMode, Message, Participant, ScreenMode, Thread};
use tracing::info;

impl ChatStore {
    /// Populate thread, participants and messages in one transition.
    ///
    /// Loading a different thread than the one in memory replaces all
    /// per-thread state, dedup guards included. Re-initializing the same
    /// thread (or adopting a freshly created one) keeps the round flags and
    /// any optimistic message whose slot the incoming history does not cover.
    pub fn initialize_thread(
        &mut self,
        thread: Thread,
        participants: Vec<Participant>,
        messages: Vec<Message>,
    ) {
        self.apply("initialize_thread", |s| {
            let switching = s.thread_id().is_some_and(|id| id != thread.id);
            if switching {
                info!(from = ?s.thread_id(), to = %thread.id, "Switching thread");
                *s = StoreState {
                    screen_mode: s.screen_mode,
                    ..StoreState::default()
                };
            }

            let optimistic: Vec<Message> = if switching {
                Vec::new()
            } else {
                s.messages.drain(..).filter(|m| m.is_optimistic).collect()
            };

            s.chat_mode = thread.mode;
            s.enable_web_search = thread.enable_web_search;
            s.thread = Some(thread);
            s.participants = normalize_priorities(participants);
            s.is_creating_thread = false;

            s.messages.clear();
            for message in messages {
                insert_message(&mut s.messages, message);
            }
            for message in optimistic {
                let covered = s
                    .messages
                    .iter()
                    .any(|m| m.round_number == message.round_number && m.slot() == message.slot());
                if !covered {
                    insert_message(&mut s.messages, message);
                }
            }
        });
    }

    /// Apply the generated title and slug.
    pub fn update_thread_title(
        &mut self,
        title: impl Into<String>,
        slug: impl Into<String>,
    ) -> Result<(), StoreError> {
        let (title, slug) = (title.into(), slug.into());
        self.commit("update_thread_title", |s| {
            let thread = s.thread.as_mut().ok_or(StoreError::NoThread)?;
            thread.title = title;
            thread.slug = slug;
            thread.is_ai_generated_title = true;
            Ok(())
        })
    }

    /// Change the conversation mode between rounds.
    pub fn set_chat_mode(&mut self, mode: ChatMode) -> Result<(), StoreError> {
        self.commit("set_chat_mode", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }
            s.chat_mode = mode;
            if let Some(thread) = s.thread.as_mut() {
                thread.mode = mode;
            }
            Ok(())
        })
    }

    pub fn set_web_search_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.commit("set_web_search_enabled", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }
            s.enable_web_search = enabled;
            if let Some(thread) = s.thread.as_mut() {
                thread.enable_web_search = enabled;
            }
            Ok(())
        })
    }

    /// Replace the roster. Priorities are renumbered to `0..n`.
    pub fn update_participants(&mut self, participants: Vec<Participant>) -> Result<(), StoreError> {
        self.commit("update_participants", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }
            s.participants = normalize_priorities(participants);
            Ok(())
        })
    }

    pub fn set_participant_enabled(&mut self, id: &str, enabled: bool) -> Result<(), StoreError> {
        self.commit("set_participant_enabled", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }
            if let Some(p) = s.participants.iter_mut().find(|p| p.id == id) {
                p.is_enabled = enabled;
            }
            Ok(())
        })
    }

    pub fn set_screen_mode(&mut self, mode: ScreenMode) {
        self.apply("set_screen_mode", |s| s.screen_mode = mode);
    }

    pub fn set_is_creating_thread(&mut self, creating: bool) {
        self.apply("set_is_creating_thread", |s| s.is_creating_thread = creating);
    }

    pub fn set_has_navigated(&mut self, navigated: bool) {
        self.apply("set_has_navigated", |s| s.has_navigated = navigated);
    }

    /// Back to an empty overview: everything goes, dedup guards included.
    pub fn reset_to_new_chat(&mut self) {
        self.apply("reset_to_new_chat", |s| *s = StoreState::default());
    }

    /// Leave the thread for the overview screen. Keeps the roster and form
    /// preferences so the next thread starts with the same council.
    pub fn reset_to_overview(&mut self) {
        self.apply("reset_to_overview", |s| {
            *s = StoreState {
                participants: std::mem::take(&mut s.participants),
                chat_mode: s.chat_mode,
                enable_web_search: s.enable_web_search,
                screen_mode: ScreenMode::Overview,
                ..StoreState::default()
            };
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use roundtable_domain::Model;

    #[test]
    fn initialize_sorts_and_dedupes_history() {
        let mut store = ChatStore::new();
        let mut history = completed_round(0, 2);
        history.reverse();
        history.push(history[0].clone());

        store.initialize_thread(thread(), participants(2), history);

        assert_eq!(store.state().messages.len(), 3);
        assert!(store.state().messages[0].is_user());
        assert_eq!(store.state().messages[2].participant_index(), Some(1));
    }

    #[test]
    fn switching_thread_clears_guards() {
        let mut store = store_with(2);
        assert!(store.try_mark_pre_search_triggered(0));
        assert!(store.try_mark_moderator_created(0));

        store.initialize_thread(Thread::new("thread-b", ChatMode::Solving), participants(2), vec![]);

        assert!(store.state().guards.is_empty());
        assert_eq!(store.state().chat_mode(), ChatMode::Solving);
    }

    #[test]
    fn reinitializing_same_thread_keeps_uncovered_optimistic_message() {
        let mut store = store_with(2);
        store.prepare_for_new_message("hello", true).unwrap();

        store.initialize_thread(thread(), participants(2), vec![]);

        assert_eq!(store.state().messages.len(), 1);
        assert!(store.state().messages[0].is_optimistic);
        assert_eq!(store.state().pending_message.as_deref(), Some("hello"));
    }

    #[test]
    fn reinitializing_replaces_optimistic_with_authoritative() {
        let mut store = store_with(2);
        store.prepare_for_new_message("hello", true).unwrap();

        let confirmed = Message::user("thread-a_r0_user", 0, "hello");
        store.initialize_thread(thread(), participants(2), vec![confirmed]);

        assert_eq!(store.state().messages.len(), 1);
        assert!(!store.state().messages[0].is_optimistic);
        assert_eq!(store.state().messages[0].id, "thread-a_r0_user");
    }

    #[test]
    fn roster_changes_rejected_mid_round() {
        let mut store = store_with(2);
        store.prepare_for_new_message("q", true).unwrap();
        store.begin_participant_streaming().unwrap();

        let result = store.update_participants(participants(3));
        assert_eq!(result, Err(StoreError::RoundInProgress));
        assert_eq!(store.state().participant_count(), 2);
        assert_eq!(store.set_chat_mode(ChatMode::Solving), Err(StoreError::RoundInProgress));
    }

    #[test]
    fn roster_replaced_between_rounds() {
        let mut store = store_with(2);
        let roster = vec![
            Participant::new("x", Model::Grok4, 5),
            Participant::new("y", Model::Gpt41, 2),
        ];
        store.update_participants(roster).unwrap();
        assert_eq!(store.state().participants[0].id, "y");
        assert_eq!(store.state().participants[1].priority, 1);

        store.set_participant_enabled("y", false).unwrap();
        assert_eq!(store.state().participant_count(), 1);
        assert_eq!(store.state().participant_at(0).map(|p| p.id.as_str()), Some("x"));
    }

    #[test]
    fn title_update_requires_thread() {
        let mut store = ChatStore::new();
        assert_eq!(
            store.update_thread_title("Title", "title"),
            Err(StoreError::NoThread)
        );

        let mut store = store_with(1);
        store.update_thread_title("Rust ownership", "rust-ownership").unwrap();
        let thread = store.state().thread.as_ref().unwrap();
        assert!(thread.is_ai_generated_title);
        assert_eq!(thread.slug, "rust-ownership");
    }

    #[test]
    fn resets_clear_dedup_trackers() {
        let mut store = store_with(2);
        store.try_mark_pre_search_triggered(0);
        store.reset_to_overview();
        assert!(store.state().guards.is_empty());
        assert!(store.state().thread.is_none());
        assert_eq!(store.state().participants.len(), 2);

        store.try_mark_moderator_created(0);
        store.reset_to_new_chat();
        assert!(store.state().guards.is_empty());
        assert!(store.state().participants.is_empty());
    }
}
