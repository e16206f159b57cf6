//! Stream resumption after a reload.

use super::streaming::{advance_pointer, participant_message_mut};
use super::{ChatStore, ParticipantStep, StoreError};
use chrono::{DateTime, Utc};
use roundtable_domain::resumption::entities::evaluate;
use roundtable_domain::{ResumptionVerdict, StreamResumptionRecord};
use tracing::{info, warn};

impl ChatStore {
    pub fn set_stream_resumption(&mut self, record: StreamResumptionRecord) {
        self.apply("set_stream_resumption", |s| s.stream_resumption = Some(record));
    }

    pub fn clear_stream_resumption(&mut self) {
        self.apply("clear_stream_resumption", |s| s.stream_resumption = None);
    }

    /// Validate the stored record against the loaded thread and roster.
    pub fn resumption_verdict(&self, now: DateTime<Utc>) -> ResumptionVerdict {
        evaluate(
            self.state.stream_resumption.as_ref(),
            self.state.thread_id(),
            self.state.participant_count(),
            &self.policy,
            now,
        )
    }

    /// An active, in-bounds, unexpired stream for this thread exists.
    pub fn needs_stream_resumption(&self, now: DateTime<Utc>) -> bool {
        self.resumption_verdict(now).needs_stream_resumption()
    }

    /// The stream already finished: fetch the persisted message instead.
    pub fn needs_message_sync(&self, now: DateTime<Utc>) -> bool {
        self.resumption_verdict(now).needs_message_sync()
    }

    /// `true` exactly once per `(round, participant)`.
    pub fn mark_resumption_attempted(&mut self, round_number: u32, participant_index: usize) -> bool {
        self.apply("mark_resumption_attempted", |s| {
            s.guards
                .try_mark_resumption_attempted(round_number, participant_index)
        })
    }

    /// Re-enter the participant phase at `participant_index` to receive the
    /// rest of a buffered stream.
    pub fn begin_resumed_participant(
        &mut self,
        round_number: u32,
        participant_index: usize,
    ) -> Result<String, StoreError> {
        self.commit("begin_resumed_participant", |s| {
            if s.is_moderator_streaming || s.is_creating_moderator {
                return Err(StoreError::RoundInProgress);
            }
            if s.is_streaming && s.streaming_round_number != Some(round_number) {
                return Err(StoreError::UnexpectedRound {
                    expected: s.streaming_round_number,
                    got: round_number,
                });
            }
            let count = s.participant_count();
            s.orchestrator.resume_at(participant_index, count)?;
            s.is_streaming = true;
            s.streaming_round_number = Some(round_number);
            let message = participant_message_mut(s, round_number, participant_index)?;
            info!(round_number, participant_index, "Resuming participant stream");
            Ok(message.id.clone())
        })
    }

    /// A resumed (or synced) participant reached its terminal signal. Behaves
    /// like normal completion: returns the next participant to start, or
    /// `None` when the round is complete.
    pub fn handle_resumed_stream_complete(
        &mut self,
        round_number: u32,
        participant_index: usize,
    ) -> Result<Option<usize>, StoreError> {
        self.commit("handle_resumed_stream_complete", |s| {
            if s.is_streaming && s.streaming_round_number != Some(round_number) {
                return Err(StoreError::UnexpectedRound {
                    expected: s.streaming_round_number,
                    got: round_number,
                });
            }
            let count = s.participant_count();
            s.orchestrator.resume_at(participant_index, count)?;
            s.is_streaming = true;
            s.streaming_round_number = Some(round_number);
            s.stream_resumption = None;

            Ok(match advance_pointer(s, round_number)? {
                ParticipantStep::Next(index) => Some(index),
                _ => None,
            })
        })
    }

    /// The stream could not be re-attached (not found, network error). Drop
    /// the record and any half-received output so new messages are not
    /// blocked.
    pub fn handle_resumption_failure(&mut self) {
        self.apply("handle_resumption_failure", |s| {
            let Some(record) = s.stream_resumption.take() else {
                return;
            };
            warn!(stream_id = %record.stream_id, "Stream resumption failed");
            if s.streaming_round_number == Some(record.round_number) && s.is_streaming {
                s.messages.retain(|m| {
                    m.round_number != record.round_number || m.is_user() || m.is_terminal()
                });
                s.clear_streaming_flags();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use chrono::Duration;
    use roundtable_domain::{ChatMode, FinishReason, InvalidReason, Message, Model, Thread};

    fn with_record(record: StreamResumptionRecord) -> ChatStore {
        let mut store = store_with(2);
        store.set_messages(vec![Message::user("thread-a_r0_user", 0, "q")]);
        store.set_stream_resumption(record);
        store
    }

    #[test]
    fn active_record_needs_resumption() {
        let store = with_record(StreamResumptionRecord::active(THREAD, 0, 1));
        assert!(store.needs_stream_resumption(Utc::now()));
        assert!(!store.needs_message_sync(Utc::now()));
    }

    #[test]
    fn completed_record_needs_sync_only() {
        let store = with_record(StreamResumptionRecord::active(THREAD, 0, 1).completed());
        assert!(!store.needs_stream_resumption(Utc::now()));
        assert!(store.needs_message_sync(Utc::now()));
    }

    #[test]
    fn expired_record_is_ignored_even_if_active() {
        let now = Utc::now();
        let store = with_record(
            StreamResumptionRecord::active(THREAD, 0, 0).created_at(now - Duration::hours(2)),
        );
        assert!(!store.needs_stream_resumption(now));
        assert_eq!(
            store.resumption_verdict(now),
            ResumptionVerdict::Invalid(InvalidReason::Expired)
        );
    }

    #[test]
    fn record_for_other_thread_is_ignored() {
        let mut store = store_with(2);
        store.set_stream_resumption(StreamResumptionRecord::active("thread-a", 0, 0));
        store.initialize_thread(Thread::new("thread-b", ChatMode::Debating), participants(2), vec![]);
        // Switching threads drops the record; a record for A set while B is
        // loaded is rejected as well.
        store.set_stream_resumption(StreamResumptionRecord::active("thread-a", 0, 0));
        assert!(!store.needs_stream_resumption(Utc::now()));
    }

    #[test]
    fn out_of_range_participant_is_not_resumed() {
        let store = with_record(StreamResumptionRecord::active(THREAD, 0, 5));
        assert_eq!(
            store.resumption_verdict(Utc::now()),
            ResumptionVerdict::Invalid(InvalidReason::ParticipantOutOfRange)
        );
    }

    #[test]
    fn resumption_attempted_once_per_pair() {
        let mut store = store_with(2);
        assert!(store.mark_resumption_attempted(0, 1));
        assert!(!store.mark_resumption_attempted(0, 1));
        assert!(!store.mark_resumption_attempted(0, 1));
        assert!(store.mark_resumption_attempted(0, 0));
        assert!(store.mark_resumption_attempted(1, 1));
    }

    #[test]
    fn resumed_completion_reports_next_participant() {
        let mut store = with_record(StreamResumptionRecord::active(THREAD, 0, 0));
        store.begin_resumed_participant(0, 0).unwrap();
        assert!(store.append_participant_chunk(0, "rest of answer"));

        let mut done = Message::participant(THREAD, 0, 0, "p0", Model::Gpt52).with_text("full");
        done.finish(Some(FinishReason::Stop));
        store.upsert_message(done);

        assert_eq!(store.handle_resumed_stream_complete(0, 0), Ok(Some(1)));
        assert_eq!(store.current_participant_index(), 1);
        assert!(store.state().stream_resumption.is_none());
    }

    #[test]
    fn synced_last_participant_completes_round() {
        let mut store = with_record(StreamResumptionRecord::active(THREAD, 0, 1).completed());
        store.upsert_message(
            Message::participant(THREAD, 0, 0, "p0", Model::Gpt52)
                .with_text("a")
                .with_finish_reason(FinishReason::Stop),
        );
        store.upsert_message(
            Message::participant(THREAD, 0, 1, "p1", Model::Gpt52)
                .with_text("b")
                .with_finish_reason(FinishReason::Stop),
        );

        assert_eq!(store.handle_resumed_stream_complete(0, 1), Ok(None));
        assert!(!store.is_streaming());
        assert!(store.is_round_complete(0));
    }

    #[test]
    fn failure_clears_record_and_unblocks_new_messages() {
        let mut store = with_record(StreamResumptionRecord::active(THREAD, 0, 0));
        store.begin_resumed_participant(0, 0).unwrap();

        store.handle_resumption_failure();

        assert!(store.state().stream_resumption.is_none());
        assert!(!store.is_streaming());
        assert!(store.prepare_for_new_message("next", true).is_ok());
    }
}
