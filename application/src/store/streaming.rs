//! Round staging and participant streaming.
//!
//! The participant pointer only moves inside [`ChatStore::complete_participant`],
//! [`ChatStore::fail_participant`] and [`ChatStore::advance_participant`], each
//! of which commits the finished message and the new index together. A caller
//! reads the committed index back from the return value before opening the
//! next stream.

use super::messages::insert_message;
use super::{ChatStore, ParticipantStep, StoreError, StoreState};
use roundtable_domain::orchestration::participants::is_round_complete;
use roundtable_domain::orchestration::round::{
    current_round_number, find_slot, is_round_unstarted, next_round_number,
};
use roundtable_domain::{
    Advance, DomainError, FinishReason, Message, MessageError, MessageSlot, RecordStatus,
    ScreenMode,
};
use tracing::{debug, info};

/// Participant message slot for `index` in the streaming round, created
/// empty on first use.
pub(super) fn participant_message_mut(
    s: &mut StoreState,
    round_number: u32,
    index: usize,
) -> Result<&mut Message, StoreError> {
    let slot = MessageSlot::Participant(index);
    let exists = find_slot(&s.messages, round_number, slot).is_some();
    if !exists {
        let thread_id = s.thread_id().ok_or(StoreError::NoThread)?.to_string();
        let participant = s.participant_at(index).ok_or(DomainError::ParticipantOutOfRange {
            index,
            count: s.participant_count(),
        })?;
        let message = Message::participant(
            &thread_id,
            round_number,
            index,
            participant.id.clone(),
            participant.model.clone(),
        );
        insert_message(&mut s.messages, message);
    }
    s.messages
        .iter_mut()
        .find(|m| m.round_number == round_number && m.slot() == slot)
        .ok_or(StoreError::MessageNotFound(format!("r{}_p{}", round_number, index)))
}

/// Move the pointer past the current participant and translate the outcome.
pub(super) fn advance_pointer(s: &mut StoreState, round_number: u32) -> Result<ParticipantStep, StoreError> {
    let count = s.participant_count();
    let advance = s.orchestrator.advance(&s.messages, round_number, count)?;
    Ok(match advance {
        Advance::Next(index) => ParticipantStep::Next(index),
        Advance::RoundComplete => {
            // Participants are done; the round number stays so the moderator
            // can be created for it.
            s.is_streaming = false;
            s.waiting_to_start_streaming = false;
            ParticipantStep::RoundComplete
        }
    })
}

/// The current participant is `index` in the streaming round.
fn check_current(s: &StoreState, index: usize) -> Result<u32, StoreError> {
    let expected = s.current_participant_index();
    if expected != index {
        return Err(StoreError::UnexpectedParticipant {
            expected,
            got: index,
        });
    }
    Ok(s.streaming_round_number.unwrap_or_else(|| s.current_round_number()))
}

impl ChatStore {
    /// Stage a new round in one transition.
    ///
    /// The round is derived from the messages after the optimistic entry is
    /// in place: an unstarted latest round (user message only) is reused, so
    /// calling this twice never stacks two optimistic messages. Returns the
    /// committed `streaming_round_number`.
    pub fn prepare_for_new_message(
        &mut self,
        text: impl Into<String>,
        optimistic: bool,
    ) -> Result<u32, StoreError> {
        let text = text.into();
        self.commit("prepare_for_new_message", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }

            let latest = current_round_number(&s.messages);
            let reuse = is_round_unstarted(&s.messages, latest);
            let round_number = if reuse {
                latest
            } else {
                next_round_number(&s.messages)
            };

            if optimistic {
                let existing = s.messages.iter_mut().find(|m| {
                    m.round_number == round_number && m.is_user() && m.is_optimistic
                });
                match existing {
                    Some(message) => {
                        *message = Message::optimistic_user(round_number, text.clone());
                    }
                    None if reuse => {}
                    None => insert_message(
                        &mut s.messages,
                        Message::optimistic_user(round_number, text.clone()),
                    ),
                }
            }

            let staged = current_round_number(&s.messages);
            s.streaming_round_number = Some(staged);
            s.pending_message = Some(text);
            s.has_sent_pending_message = false;
            s.waiting_to_start_streaming = false;
            s.is_waiting_for_changelog = true;
            s.error = None;
            s.stream_resumption = None;
            s.orchestrator.reset();
            if s.screen_mode != ScreenMode::Overview {
                s.has_navigated = false;
            }
            Ok(staged)
        })
    }

    pub fn set_waiting_for_changelog(&mut self, waiting: bool) {
        self.apply("set_waiting_for_changelog", |s| {
            s.is_waiting_for_changelog = waiting
        });
    }

    /// The pending message went out; streaming may start once the gate opens.
    pub fn mark_pending_message_sent(&mut self) -> Result<(), StoreError> {
        self.commit("mark_pending_message_sent", |s| {
            if s.pending_message.is_none() {
                return Err(StoreError::NoPendingMessage);
            }
            s.has_sent_pending_message = true;
            s.waiting_to_start_streaming = true;
            Ok(())
        })
    }

    /// Open the participant phase of the staged round at participant 0.
    pub fn begin_participant_streaming(&mut self) -> Result<u32, StoreError> {
        self.commit("begin_participant_streaming", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }
            if s.thread.is_none() {
                return Err(StoreError::NoThread);
            }
            if s.participant_count() == 0 {
                return Err(DomainError::NoParticipants.into());
            }
            let round_number = s
                .streaming_round_number
                .unwrap_or_else(|| current_round_number(&s.messages));
            if is_round_complete(&s.messages, round_number, s.participant_count()) {
                return Err(StoreError::RoundAlreadyComplete(round_number));
            }

            s.is_streaming = true;
            s.streaming_round_number = Some(round_number);
            s.orchestrator.reset();
            s.waiting_to_start_streaming = false;
            s.pending_message = None;
            info!(round_number, "Participant phase started");
            Ok(round_number)
        })
    }

    /// Create the empty message for the current participant. Only the
    /// committed current index may start.
    pub fn start_participant(&mut self, index: usize) -> Result<String, StoreError> {
        self.commit("start_participant", |s| {
            if !s.is_streaming {
                return Err(StoreError::NotStreaming);
            }
            let round_number = check_current(s, index)?;
            let message = participant_message_mut(s, round_number, index)?;
            Ok(message.id.clone())
        })
    }

    /// Append a text chunk. Returns `false` (and changes nothing) once
    /// streaming was stopped or when the chunk belongs to another participant.
    pub fn append_participant_chunk(&mut self, index: usize, chunk: &str) -> bool {
        self.append_to_participant("append_participant_chunk", index, |m| m.push_text(chunk))
    }

    pub fn append_participant_reasoning(&mut self, index: usize, chunk: &str) -> bool {
        self.append_to_participant("append_participant_reasoning", index, |m| {
            m.push_reasoning(chunk)
        })
    }

    fn append_to_participant(
        &mut self,
        op: &'static str,
        index: usize,
        f: impl FnOnce(&mut Message),
    ) -> bool {
        self.commit(op, |s| {
            if !s.is_streaming {
                return Err(StoreError::NotStreaming);
            }
            let round_number = check_current(s, index)?;
            f(participant_message_mut(s, round_number, index)?);
            Ok(())
        })
        .map_err(|e| debug!(index, error = %e, "Dropped participant chunk"))
        .is_ok()
    }

    /// Terminal signal for the current participant: mark its message and
    /// advance in the same transition.
    pub fn complete_participant(
        &mut self,
        index: usize,
        finish_reason: Option<FinishReason>,
    ) -> Result<ParticipantStep, StoreError> {
        self.finish_participant("complete_participant", index, |m| m.finish(finish_reason))
    }

    /// Failure of the current participant. The error stays on its message and
    /// the round moves on.
    pub fn fail_participant(
        &mut self,
        index: usize,
        error: MessageError,
    ) -> Result<ParticipantStep, StoreError> {
        self.finish_participant("fail_participant", index, |m| m.fail(error))
    }

    fn finish_participant(
        &mut self,
        op: &'static str,
        index: usize,
        f: impl FnOnce(&mut Message),
    ) -> Result<ParticipantStep, StoreError> {
        if !self.state.is_streaming {
            debug!(index, op, "Ignored after stop");
            return Ok(ParticipantStep::Ignored);
        }
        self.commit(op, |s| {
            let round_number = check_current(s, index)?;
            f(participant_message_mut(s, round_number, index)?);
            advance_pointer(s, round_number)
        })
    }

    /// Advance when the current participant's terminal message arrived by
    /// other means (upsert from persistence, message sync).
    pub fn advance_participant(&mut self) -> Result<ParticipantStep, StoreError> {
        if !self.state.is_streaming {
            return Ok(ParticipantStep::Ignored);
        }
        self.commit("advance_participant", |s| {
            let round_number = s
                .streaming_round_number
                .unwrap_or_else(|| current_round_number(&s.messages));
            advance_pointer(s, round_number)
        })
    }

    /// Abandon the round. Unfinished participant and moderator output is
    /// dropped, finished participants stay. Idempotent.
    pub fn stop_streaming(&mut self) {
        self.apply("stop_streaming", |s| {
            if let Some(round_number) = s.streaming_round_number {
                s.messages
                    .retain(|m| m.round_number != round_number || m.is_user() || m.is_terminal());
                for analysis in s
                    .analyses
                    .iter_mut()
                    .filter(|a| a.round_number == round_number && a.status.is_in_flight())
                {
                    analysis.status = RecordStatus::Failed;
                    analysis.error_message = Some("Stopped".to_string());
                }
            }
            s.clear_streaming_flags();
            s.is_regenerating = false;
            s.regenerating_round_number = None;
            s.pending_message = None;
            s.has_sent_pending_message = false;
        });
    }

    /// Close the round in one transition.
    pub fn complete_streaming(&mut self) {
        self.apply("complete_streaming", |s| {
            if let Some(round_number) = s.streaming_round_number {
                info!(round_number, "Round complete");
            }
            s.clear_streaming_flags();
            s.is_regenerating = false;
            s.regenerating_round_number = None;
            s.pending_message = None;
            s.has_sent_pending_message = false;
            s.is_waiting_for_changelog = false;
            s.stream_resumption = None;
            s.pending_animations.clear();
        });
    }

    /// Clear a round's assistant output so it can be replayed with the same
    /// participants and context. Only the latest round can be regenerated.
    pub fn start_regeneration(&mut self, round_number: u32) -> Result<(), StoreError> {
        self.commit("start_regeneration", |s| {
            if s.is_round_in_progress() {
                return Err(StoreError::RoundInProgress);
            }
            if round_number != current_round_number(&s.messages) {
                return Err(StoreError::NotLatestRound(round_number));
            }
            if find_slot(&s.messages, round_number, MessageSlot::User).is_none() {
                return Err(StoreError::MessageNotFound(format!("r{}_user", round_number)));
            }

            s.messages
                .retain(|m| m.round_number != round_number || m.is_user());
            s.analyses.retain(|a| a.round_number != round_number);
            s.guards.clear_round(round_number);
            if s
                .stream_resumption
                .as_ref()
                .is_some_and(|r| r.round_number == round_number)
            {
                s.stream_resumption = None;
            }
            s.error = None;
            s.is_regenerating = true;
            s.regenerating_round_number = Some(round_number);
            s.streaming_round_number = Some(round_number);
            s.orchestrator.reset();
            if s.screen_mode != ScreenMode::Overview {
                s.has_navigated = false;
            }
            info!(round_number, "Regenerating round");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use roundtable_domain::ErrorCategory;

    /// Store with a staged and opened round 0.
    fn streaming(n: usize) -> ChatStore {
        let mut store = store_with(n);
        store.prepare_for_new_message("question", true).unwrap();
        store.begin_participant_streaming().unwrap();
        store
    }

    fn answer(store: &mut ChatStore, index: usize, text: &str) -> ParticipantStep {
        store.start_participant(index).unwrap();
        assert!(store.append_participant_chunk(index, text));
        store
            .complete_participant(index, Some(FinishReason::Stop))
            .unwrap()
    }

    #[test]
    fn prepare_twice_keeps_one_optimistic_message() {
        let mut store = store_with(2);
        let first = store.prepare_for_new_message("hello", true).unwrap();
        let second = store.prepare_for_new_message("hello again", true).unwrap();

        assert_eq!(first, second);
        let users: Vec<_> = store.state().messages.iter().filter(|m| m.is_user()).collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].text(), "hello again");
        assert_eq!(store.state().streaming_round_number, Some(0));
    }

    #[test]
    fn prepare_targets_round_of_latest_message() {
        let mut store = store_with(2);
        store.set_messages(completed_round(0, 2));

        let round = store.prepare_for_new_message("next", true).unwrap();

        assert_eq!(round, 1);
        assert_eq!(store.state().streaming_round_number, Some(1));
        assert_eq!(store.current_round_number(), 1);
        assert!(store.state().is_waiting_for_changelog);
        assert_eq!(store.state().pending_message.as_deref(), Some("next"));
    }

    #[test]
    fn confirmed_user_message_restages_round_without_optimistic_entry() {
        let mut store = store_with(1);
        store.set_messages(completed_round(0, 1));
        store.prepare_for_new_message("next", false).unwrap();
        store
            .confirm_user_message(Message::user("thread-a_r1_user", 1, "next"))
            .unwrap();

        assert_eq!(store.begin_participant_streaming(), Ok(1));
        let started = store.start_participant(0).unwrap();
        assert_eq!(started, "thread-a_r1_p0");
        assert!(store.append_participant_chunk(0, " NEW"));

        assert_eq!(store.messages_in_round(0)[1].text(), "answer");
        assert_eq!(store.messages_in_round(1).len(), 2);
    }

    #[test]
    fn completed_round_cannot_be_reopened() {
        let mut store = store_with(2);
        store.set_messages(completed_round(0, 2));
        store.prepare_for_new_message("next", false).unwrap();

        assert_eq!(
            store.begin_participant_streaming(),
            Err(StoreError::RoundAlreadyComplete(0))
        );
        assert!(!store.is_streaming());
    }

    #[test]
    fn prepare_clears_resumption_and_error() {
        let mut store = store_with(2);
        store.set_stream_resumption(roundtable_domain::StreamResumptionRecord::active(THREAD, 0, 0));
        store.set_error("boom");
        store.prepare_for_new_message("q", true).unwrap();
        assert!(store.state().stream_resumption.is_none());
        assert!(store.state().error.is_none());
    }

    #[test]
    fn prepare_rejected_while_streaming() {
        let mut store = streaming(2);
        assert_eq!(
            store.prepare_for_new_message("again", true),
            Err(StoreError::RoundInProgress)
        );
    }

    #[test]
    fn pending_message_lifecycle() {
        let mut store = store_with(1);
        assert_eq!(store.mark_pending_message_sent(), Err(StoreError::NoPendingMessage));

        store.prepare_for_new_message("q", true).unwrap();
        store.mark_pending_message_sent().unwrap();
        assert!(store.state().has_sent_pending_message);
        assert!(store.state().waiting_to_start_streaming);

        store.begin_participant_streaming().unwrap();
        assert!(!store.state().waiting_to_start_streaming);
        assert!(store.state().pending_message.is_none());
        assert!(store.is_streaming());
    }

    #[test]
    fn three_participants_stream_in_order() {
        let mut store = streaming(3);

        assert_eq!(answer(&mut store, 0, "a"), ParticipantStep::Next(1));
        assert!(!store.is_round_complete(0));
        assert_eq!(answer(&mut store, 1, "b"), ParticipantStep::Next(2));
        assert!(!store.is_round_complete(0));
        assert_eq!(answer(&mut store, 2, "c"), ParticipantStep::RoundComplete);
        assert!(store.is_round_complete(0));

        let assistants: Vec<_> = store
            .messages_in_round(0)
            .into_iter()
            .filter_map(|m| m.participant_index())
            .collect();
        assert_eq!(assistants, vec![0, 1, 2]);
        assert_eq!(store.current_participant_index(), 2);
        assert!(!store.is_streaming());
        assert_eq!(store.state().streaming_round_number, Some(0));
    }

    #[test]
    fn failed_participant_still_completes_round() {
        let mut store = streaming(2);
        answer(&mut store, 0, "fine");
        store.start_participant(1).unwrap();
        let step = store
            .fail_participant(1, MessageError::from_category(ErrorCategory::RateLimit))
            .unwrap();

        assert_eq!(step, ParticipantStep::RoundComplete);
        let assistants: Vec<_> = store
            .messages_in_round(0)
            .into_iter()
            .filter(|m| !m.is_user())
            .collect();
        assert_eq!(assistants.len(), 2);
        assert_eq!(assistants.iter().filter(|m| m.has_error()).count(), 1);
    }

    #[test]
    fn failed_participant_is_in_next_context() {
        let mut store = streaming(3);
        store.start_participant(0).unwrap();
        store
            .fail_participant(0, MessageError::from_category(ErrorCategory::Timeout))
            .unwrap();

        let context = store.participant_context(0, 1);
        assert_eq!(context.len(), 2);
        assert!(context[1].has_error());
    }

    #[test]
    fn empty_stream_is_tagged_silent_failure() {
        let mut store = streaming(2);
        store.start_participant(0).unwrap();
        let step = store.complete_participant(0, None).unwrap();

        assert_eq!(step, ParticipantStep::Next(1));
        let round = store.messages_in_round(0);
        let message = round[1];
        assert_eq!(
            message.error.as_ref().map(|e| e.category),
            Some(ErrorCategory::SilentFailure)
        );
    }

    #[test]
    fn only_current_participant_may_start() {
        let mut store = streaming(3);
        assert_eq!(
            store.start_participant(1),
            Err(StoreError::UnexpectedParticipant {
                expected: 0,
                got: 1
            })
        );
        assert!(!store.append_participant_chunk(1, "early"));
    }

    #[test]
    fn advance_requires_terminal_message() {
        let mut store = streaming(2);
        store.start_participant(0).unwrap();
        assert!(matches!(
            store.advance_participant(),
            Err(StoreError::Domain(DomainError::ParticipantNotTerminal { .. }))
        ));
        assert_eq!(store.current_participant_index(), 0);
    }

    #[test]
    fn stop_is_immediate_and_idempotent() {
        let mut store = streaming(3);
        answer(&mut store, 0, "done");
        store.start_participant(1).unwrap();
        store.append_participant_chunk(1, "half");

        store.stop_streaming();
        let after_first = store.state().clone();
        let version = store.version();
        store.stop_streaming();

        assert_eq!(store.state(), &after_first);
        assert_eq!(store.version(), version);
        assert!(!store.is_streaming());
        assert_eq!(store.current_participant_index(), 0);
    }

    #[test]
    fn stop_at_boundary_keeps_exactly_completed_participants() {
        let mut store = streaming(3);
        answer(&mut store, 0, "one");
        // Pointer is at 1; its stream has not opened yet.
        store.stop_streaming();

        let assistants: Vec<_> = store
            .messages_in_round(0)
            .into_iter()
            .filter_map(|m| m.participant_index())
            .collect();
        assert_eq!(assistants, vec![0]);
    }

    #[test]
    fn chunks_after_stop_are_ignored() {
        let mut store = streaming(2);
        store.start_participant(0).unwrap();
        store.stop_streaming();

        let version = store.version();
        assert!(!store.append_participant_chunk(0, "late"));
        assert_eq!(
            store.complete_participant(0, Some(FinishReason::Stop)),
            Ok(ParticipantStep::Ignored)
        );
        assert_eq!(store.version(), version);
        assert!(!store.is_streaming());
    }

    #[test]
    fn complete_streaming_clears_flags_together() {
        let mut store = streaming(1);
        answer(&mut store, 0, "x");
        store.register_animation(0);
        store.complete_streaming();

        let s = store.state();
        assert!(!s.is_streaming);
        assert!(!s.is_moderator_streaming);
        assert!(s.streaming_round_number.is_none());
        assert!(s.pending_animations.is_empty());
        assert!(!s.is_waiting_for_changelog);
    }

    #[test]
    fn regeneration_clears_round_output_and_tracking() {
        let mut store = store_with(2);
        store.set_messages(completed_round(0, 2));
        store.try_mark_moderator_created(0);
        store.try_mark_pre_search_triggered(0);
        store.set_error("old failure");

        store.start_regeneration(0).unwrap();

        let s = store.state();
        assert_eq!(s.messages.len(), 1);
        assert!(s.messages[0].is_user());
        assert!(s.guards.is_empty());
        assert!(s.error.is_none());
        assert!(s.is_regenerating);
        assert_eq!(s.regenerating_round_number, Some(0));

        store.begin_participant_streaming().unwrap();
        assert_eq!(store.state().streaming_round_number, Some(0));
    }

    #[test]
    fn regeneration_only_for_latest_round() {
        let mut store = store_with(1);
        let mut history = completed_round(0, 1);
        history.extend(completed_round(1, 1));
        store.set_messages(history);
        assert_eq!(store.start_regeneration(0), Err(StoreError::NotLatestRound(0)));
    }

    #[test]
    fn changelog_wait_is_set_by_staging_and_cleared_explicitly() {
        let mut store = store_with(1);
        store.prepare_for_new_message("q", true).unwrap();
        assert!(store.state().is_waiting_for_changelog);
        store.set_waiting_for_changelog(false);
        assert!(!store.state().is_waiting_for_changelog);
    }
}
