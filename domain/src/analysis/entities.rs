//! Analysis record produced by the moderator pass for one round

use crate::core::staleness::StalenessPolicy;
use crate::core::status::RecordStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured synthesis payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub summary: String,
    /// Participant indices that contributed a successful answer.
    pub contributing_participants: Vec<usize>,
    /// Participant indices that ended in error.
    pub failed_participants: Vec<usize>,
}

/// Moderator/analysis record (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub thread_id: String,
    pub round_number: u32,
    pub status: RecordStatus,
    pub payload: Option<AnalysisPayload>,
    pub error_message: Option<String>,
    /// Ids of the participant messages the analysis covers.
    pub participant_message_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn pending(
        thread_id: impl Into<String>,
        round_number: u32,
        participant_message_ids: Vec<String>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: format!("{}_r{}_analysis", thread_id, round_number),
            thread_id,
            round_number,
            status: RecordStatus::Pending,
            payload: None,
            error_message: None,
            participant_message_ids,
            created_at: Utc::now(),
        }
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Pending/streaming past the analysis threshold.
    pub fn is_stale(&self, policy: &StalenessPolicy, now: DateTime<Utc>) -> bool {
        self.status.is_in_flight() && policy.is_analysis_stale(self.created_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn in_flight_analysis_goes_stale_after_a_minute() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let record = AnalysisRecord::pending("t1", 0, vec![]).created_at(now - Duration::seconds(61));
        assert!(record.is_stale(&policy, now));
    }

    #[test]
    fn complete_analysis_never_stale() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let mut record =
            AnalysisRecord::pending("t1", 0, vec![]).created_at(now - Duration::hours(2));
        record.status = RecordStatus::Complete;
        assert!(!record.is_stale(&policy, now));
    }
}
