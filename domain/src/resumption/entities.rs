//! Stream resumption record and its validation rules

use crate::core::staleness::StalenessPolicy;
use crate::message::identity::stream_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side state of a buffered stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Active,
    Completed,
}

/// A network stream that may outlive a page reload (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResumptionRecord {
    pub stream_id: String,
    pub thread_id: String,
    pub round_number: u32,
    pub participant_index: usize,
    pub state: StreamState,
    pub created_at: DateTime<Utc>,
}

impl StreamResumptionRecord {
    pub fn active(thread_id: impl Into<String>, round_number: u32, participant_index: usize) -> Self {
        let thread_id = thread_id.into();
        Self {
            stream_id: stream_id(&thread_id, round_number, participant_index),
            thread_id,
            round_number,
            participant_index,
            state: StreamState::Active,
            created_at: Utc::now(),
        }
    }

    pub fn completed(mut self) -> Self {
        self.state = StreamState::Completed;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Why a resumption record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    ThreadMismatch,
    ParticipantOutOfRange,
    Expired,
}

/// What to do with a resumption record on mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumptionVerdict {
    /// No record.
    None,
    /// Re-attach to the running stream.
    Resume {
        round_number: u32,
        participant_index: usize,
    },
    /// Stream finished while we were away: fetch the persisted message.
    SyncMessage {
        round_number: u32,
        participant_index: usize,
    },
    /// Record does not apply to the current thread or configuration.
    Invalid(InvalidReason),
}

impl ResumptionVerdict {
    pub fn needs_stream_resumption(&self) -> bool {
        matches!(self, ResumptionVerdict::Resume { .. })
    }

    pub fn needs_message_sync(&self) -> bool {
        matches!(self, ResumptionVerdict::SyncMessage { .. })
    }
}

/// Validate a record against the loaded thread and participant count.
///
/// Order: thread mismatch, participant bounds, TTL, then state.
pub fn evaluate(
    record: Option<&StreamResumptionRecord>,
    current_thread_id: Option<&str>,
    participant_count: usize,
    policy: &StalenessPolicy,
    now: DateTime<Utc>,
) -> ResumptionVerdict {
    let Some(record) = record else {
        return ResumptionVerdict::None;
    };

    if current_thread_id != Some(record.thread_id.as_str()) {
        return ResumptionVerdict::Invalid(InvalidReason::ThreadMismatch);
    }
    if record.participant_index >= participant_count {
        return ResumptionVerdict::Invalid(InvalidReason::ParticipantOutOfRange);
    }
    if policy.is_resumption_expired(record.created_at, now) {
        return ResumptionVerdict::Invalid(InvalidReason::Expired);
    }

    match record.state {
        StreamState::Active => ResumptionVerdict::Resume {
            round_number: record.round_number,
            participant_index: record.participant_index,
        },
        StreamState::Completed => ResumptionVerdict::SyncMessage {
            round_number: record.round_number,
            participant_index: record.participant_index,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn eval(record: &StreamResumptionRecord, thread: &str, count: usize) -> ResumptionVerdict {
        evaluate(
            Some(record),
            Some(thread),
            count,
            &StalenessPolicy::default(),
            Utc::now(),
        )
    }

    #[test]
    fn active_record_for_loaded_thread_resumes() {
        let record = StreamResumptionRecord::active("thread-a", 0, 1);
        assert_eq!(record.stream_id, "thread-a_r0_p1");
        assert_eq!(
            eval(&record, "thread-a", 3),
            ResumptionVerdict::Resume {
                round_number: 0,
                participant_index: 1
            }
        );
    }

    #[test]
    fn record_for_other_thread_is_invalid() {
        let record = StreamResumptionRecord::active("thread-a", 0, 0);
        let verdict = eval(&record, "thread-b", 3);
        assert_eq!(verdict, ResumptionVerdict::Invalid(InvalidReason::ThreadMismatch));
        assert!(!verdict.needs_stream_resumption());
    }

    #[test]
    fn no_loaded_thread_is_mismatch() {
        let record = StreamResumptionRecord::active("thread-a", 0, 0);
        let verdict = evaluate(
            Some(&record),
            None,
            3,
            &StalenessPolicy::default(),
            Utc::now(),
        );
        assert_eq!(verdict, ResumptionVerdict::Invalid(InvalidReason::ThreadMismatch));
    }

    #[test]
    fn out_of_range_participant_is_invalid() {
        let record = StreamResumptionRecord::active("thread-a", 0, 3);
        assert_eq!(
            eval(&record, "thread-a", 3),
            ResumptionVerdict::Invalid(InvalidReason::ParticipantOutOfRange)
        );
    }

    #[test]
    fn expired_active_record_is_invalid() {
        let record = StreamResumptionRecord::active("thread-a", 0, 0)
            .created_at(Utc::now() - Duration::hours(2));
        let verdict = eval(&record, "thread-a", 3);
        assert_eq!(verdict, ResumptionVerdict::Invalid(InvalidReason::Expired));
        assert!(!verdict.needs_stream_resumption());
    }

    #[test]
    fn completed_record_needs_sync_not_resume() {
        let record = StreamResumptionRecord::active("thread-a", 2, 0).completed();
        let verdict = eval(&record, "thread-a", 2);
        assert!(verdict.needs_message_sync());
        assert!(!verdict.needs_stream_resumption());
    }

    #[test]
    fn missing_record_is_none() {
        let verdict = evaluate(
            None,
            Some("thread-a"),
            3,
            &StalenessPolicy::default(),
            Utc::now(),
        );
        assert_eq!(verdict, ResumptionVerdict::None);
    }
}
