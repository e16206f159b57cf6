//! Gate deciding whether participant streaming may begin.

use super::entities::PreSearchRecord;
use crate::core::staleness::StalenessPolicy;
use chrono::{DateTime, Utc};

/// Whether participant streaming must wait for the round's pre-search.
///
/// - web search disabled: never wait
/// - no record for the round yet: wait (it is about to be created)
/// - record `pending` / `streaming`: wait
/// - record `complete` / `failed`: proceed (failure degrades to no context)
pub fn should_wait_for_pre_search(
    web_search_enabled: bool,
    records: &[PreSearchRecord],
    round_number: u32,
) -> bool {
    if !web_search_enabled {
        return false;
    }
    match records.iter().find(|r| r.round_number == round_number) {
        None => true,
        Some(record) => record.status.is_in_flight(),
    }
}

/// Outcome of the gate including the staleness escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Start participants; `with_search_context` tells whether results exist.
    Proceed { with_search_context: bool },
    /// Pre-search still running.
    Wait,
    /// Pre-search stuck in flight past the threshold; treat as failed.
    TimedOut,
}

impl GateDecision {
    pub fn may_start(&self) -> bool {
        !matches!(self, GateDecision::Wait)
    }
}

/// [`should_wait_for_pre_search`] plus staleness: a record stuck in flight
/// past the threshold never blocks the round.
pub fn evaluate_gate(
    web_search_enabled: bool,
    records: &[PreSearchRecord],
    round_number: u32,
    policy: &StalenessPolicy,
    now: DateTime<Utc>,
) -> GateDecision {
    let record = records.iter().find(|r| r.round_number == round_number);

    if !should_wait_for_pre_search(web_search_enabled, records, round_number) {
        let with_search_context =
            web_search_enabled && record.is_some_and(|r| r.payload.is_some());
        return GateDecision::Proceed {
            with_search_context,
        };
    }

    match record {
        Some(r) if policy.is_pre_search_stale(r.created_at, now) => GateDecision::TimedOut,
        _ => GateDecision::Wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::RecordStatus;
    use crate::search::entities::PreSearchPayload;
    use chrono::Duration;

    fn record(round: u32, status: RecordStatus) -> PreSearchRecord {
        PreSearchRecord::pending("t1", round, "query").with_status(status)
    }

    #[test]
    fn disabled_never_waits() {
        assert!(!should_wait_for_pre_search(false, &[], 0));
        assert!(!should_wait_for_pre_search(
            false,
            &[record(0, RecordStatus::Pending)],
            0
        ));
    }

    #[test]
    fn enabled_without_record_waits() {
        assert!(should_wait_for_pre_search(true, &[], 0));
    }

    #[test]
    fn in_flight_record_waits() {
        assert!(should_wait_for_pre_search(
            true,
            &[record(0, RecordStatus::Pending)],
            0
        ));
        assert!(should_wait_for_pre_search(
            true,
            &[record(0, RecordStatus::Streaming)],
            0
        ));
    }

    #[test]
    fn terminal_record_releases_gate() {
        assert!(!should_wait_for_pre_search(
            true,
            &[record(0, RecordStatus::Complete)],
            0
        ));
        assert!(!should_wait_for_pre_search(
            true,
            &[record(0, RecordStatus::Failed)],
            0
        ));
    }

    #[test]
    fn record_for_other_round_does_not_count() {
        assert!(should_wait_for_pre_search(
            true,
            &[record(0, RecordStatus::Complete)],
            1
        ));
    }

    #[test]
    fn stale_in_flight_record_times_out() {
        let now = Utc::now();
        let stale = record(0, RecordStatus::Streaming).created_at(now - Duration::seconds(11));
        let decision = evaluate_gate(true, &[stale], 0, &StalenessPolicy::default(), now);
        assert_eq!(decision, GateDecision::TimedOut);
        assert!(decision.may_start());
    }

    #[test]
    fn fresh_in_flight_record_waits() {
        let now = Utc::now();
        let fresh = record(0, RecordStatus::Pending).created_at(now - Duration::seconds(3));
        let decision = evaluate_gate(true, &[fresh], 0, &StalenessPolicy::default(), now);
        assert_eq!(decision, GateDecision::Wait);
        assert!(!decision.may_start());
    }

    #[test]
    fn complete_record_proceeds_with_context() {
        let mut complete = record(0, RecordStatus::Complete);
        complete.payload = Some(PreSearchPayload::default());
        let decision = evaluate_gate(
            true,
            &[complete],
            0,
            &StalenessPolicy::default(),
            Utc::now(),
        );
        assert_eq!(
            decision,
            GateDecision::Proceed {
                with_search_context: true
            }
        );
    }

    #[test]
    fn failed_record_proceeds_without_context() {
        let decision = evaluate_gate(
            true,
            &[record(0, RecordStatus::Failed)],
            0,
            &StalenessPolicy::default(),
            Utc::now(),
        );
        assert_eq!(
            decision,
            GateDecision::Proceed {
                with_search_context: false
            }
        );
    }
}
