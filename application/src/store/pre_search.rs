//! Pre-search records, the streaming gate and the staleness sweep.

use super::{ChatStore, StoreError, StoreState};
use chrono::{DateTime, Utc};
use roundtable_domain::search::gate::evaluate_gate;
use roundtable_domain::{
    GateDecision, PreSearchPayload, PreSearchRecord, RecordStatus, should_wait_for_pre_search,
};
use tracing::warn;

fn record_mut(s: &mut StoreState, round_number: u32) -> Result<&mut PreSearchRecord, StoreError> {
    s.pre_searches
        .iter_mut()
        .find(|r| r.round_number == round_number)
        .ok_or(StoreError::PreSearchNotFound(round_number))
}

impl ChatStore {
    /// Insert or replace the record for its round.
    pub fn add_pre_search(&mut self, record: PreSearchRecord) {
        self.apply("add_pre_search", |s| {
            s.pre_searches.retain(|r| r.round_number != record.round_number);
            s.pre_searches.push(record);
            s.pre_searches.sort_by_key(|r| r.round_number);
        });
    }

    pub fn update_pre_search_status(
        &mut self,
        round_number: u32,
        status: RecordStatus,
    ) -> Result<(), StoreError> {
        self.commit("update_pre_search_status", |s| {
            record_mut(s, round_number)?.status = status;
            Ok(())
        })
    }

    /// Results arrived: the record is complete.
    pub fn update_pre_search_data(
        &mut self,
        round_number: u32,
        payload: PreSearchPayload,
    ) -> Result<(), StoreError> {
        self.commit("update_pre_search_data", |s| {
            let record = record_mut(s, round_number)?;
            record.payload = Some(payload);
            record.status = RecordStatus::Complete;
            record.error_message = None;
            Ok(())
        })
    }

    pub fn fail_pre_search(
        &mut self,
        round_number: u32,
        error: impl Into<String>,
    ) -> Result<(), StoreError> {
        let error = error.into();
        self.commit("fail_pre_search", |s| {
            let record = record_mut(s, round_number)?;
            record.status = RecordStatus::Failed;
            record.error_message = Some(error);
            Ok(())
        })
    }

    pub fn remove_pre_search(&mut self, round_number: u32) {
        self.apply("remove_pre_search", |s| {
            s.pre_searches.retain(|r| r.round_number != round_number)
        });
    }

    pub fn pre_search_for_round(&self, round_number: u32) -> Option<&PreSearchRecord> {
        self.state
            .pre_searches
            .iter()
            .find(|r| r.round_number == round_number)
    }

    /// `true` for the first caller per round.
    pub fn try_mark_pre_search_triggered(&mut self, round_number: u32) -> bool {
        self.apply("try_mark_pre_search_triggered", |s| {
            s.guards.try_mark_pre_search_triggered(round_number)
        })
    }

    pub fn has_pre_search_triggered(&self, round_number: u32) -> bool {
        self.state.guards.has_pre_search_triggered(round_number)
    }

    pub fn clear_pre_search_tracking(&mut self, round_number: u32) {
        self.apply("clear_pre_search_tracking", |s| {
            s.guards.clear_pre_search_tracking(round_number)
        });
    }

    /// Whether participants of `round_number` must wait for its pre-search.
    pub fn should_wait_for_pre_search(&self, round_number: u32) -> bool {
        should_wait_for_pre_search(
            self.state.web_search_enabled(),
            &self.state.pre_searches,
            round_number,
        )
    }

    /// Gate decision including the staleness escape hatch.
    pub fn pre_search_gate(&self, round_number: u32, now: DateTime<Utc>) -> GateDecision {
        evaluate_gate(
            self.state.web_search_enabled(),
            &self.state.pre_searches,
            round_number,
            &self.policy,
            now,
        )
    }

    /// Mark in-flight pre-search and analysis records older than their
    /// thresholds as failed. Returns how many records changed.
    pub fn expire_stale_records(&mut self, now: DateTime<Utc>) -> usize {
        let policy = self.policy;
        self.apply("expire_stale_records", |s| {
            let mut expired = 0;
            for record in s.pre_searches.iter_mut().filter(|r| {
                r.status.is_in_flight() && policy.is_pre_search_stale(r.created_at, now)
            }) {
                warn!(round_number = record.round_number, "Pre-search timed out");
                record.status = RecordStatus::Failed;
                record.error_message = Some("Pre-search timed out".to_string());
                expired += 1;
            }
            for record in s.analyses.iter_mut().filter(|a| a.is_stale(&policy, now)) {
                warn!(round_number = record.round_number, "Analysis timed out");
                record.status = RecordStatus::Failed;
                record.error_message = Some("Analysis timed out".to_string());
                expired += 1;
            }
            expired
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use chrono::Duration;
    use roundtable_domain::{AnalysisRecord, StalenessPolicy};

    fn searching_store() -> ChatStore {
        let mut store = store_with(2);
        store.set_web_search_enabled(true).unwrap();
        store
    }

    #[test]
    fn gate_disabled_never_waits() {
        let store = store_with(2);
        assert!(!store.should_wait_for_pre_search(0));
    }

    #[test]
    fn gate_waits_until_terminal() {
        let mut store = searching_store();
        assert!(store.should_wait_for_pre_search(0));

        store.add_pre_search(PreSearchRecord::pending(THREAD, 0, "q"));
        assert!(store.should_wait_for_pre_search(0));

        store
            .update_pre_search_status(0, RecordStatus::Streaming)
            .unwrap();
        assert!(store.should_wait_for_pre_search(0));

        store
            .update_pre_search_data(0, PreSearchPayload::default())
            .unwrap();
        assert!(!store.should_wait_for_pre_search(0));
    }

    #[test]
    fn failed_pre_search_releases_gate() {
        let mut store = searching_store();
        store.add_pre_search(PreSearchRecord::pending(THREAD, 0, "q"));
        store.fail_pre_search(0, "search backend down").unwrap();

        assert!(!store.should_wait_for_pre_search(0));
        assert_eq!(
            store.pre_search_gate(0, Utc::now()),
            GateDecision::Proceed {
                with_search_context: false
            }
        );
    }

    #[test]
    fn record_for_other_round_does_not_release_gate() {
        let mut store = searching_store();
        store.add_pre_search(
            PreSearchRecord::pending(THREAD, 0, "q").with_status(RecordStatus::Complete),
        );
        assert!(store.should_wait_for_pre_search(1));
    }

    #[test]
    fn stuck_pre_search_times_out() {
        let mut store = searching_store();
        let now = Utc::now();
        store.add_pre_search(
            PreSearchRecord::pending(THREAD, 0, "q").created_at(now - Duration::seconds(11)),
        );
        assert_eq!(store.pre_search_gate(0, now), GateDecision::TimedOut);

        assert_eq!(store.expire_stale_records(now), 1);
        assert!(!store.should_wait_for_pre_search(0));
    }

    #[test]
    fn sweep_uses_configured_policy() {
        let policy = StalenessPolicy {
            analysis_stale_secs: 5,
            ..StalenessPolicy::default()
        };
        let mut store = ChatStore::with_policy(policy);
        store.initialize_thread(thread(), participants(1), vec![]);
        let now = Utc::now();
        store.add_analysis(AnalysisRecord::pending(THREAD, 0, vec![]).created_at(now - Duration::seconds(6)));

        assert_eq!(store.expire_stale_records(now), 1);
        assert_eq!(
            store.analysis_for_round(0).map(|a| a.status),
            Some(RecordStatus::Failed)
        );
        assert_eq!(store.expire_stale_records(now), 0);
    }

    #[test]
    fn pre_search_trigger_fires_once() {
        let mut store = searching_store();
        assert!(store.try_mark_pre_search_triggered(0));
        assert!(!store.try_mark_pre_search_triggered(0));
        assert!(store.has_pre_search_triggered(0));

        store.clear_pre_search_tracking(0);
        assert!(store.try_mark_pre_search_triggered(0));
    }

    #[test]
    fn updating_missing_record_fails() {
        let mut store = searching_store();
        assert_eq!(
            store.fail_pre_search(3, "x"),
            Err(StoreError::PreSearchNotFound(3))
        );
    }

    #[test]
    fn removed_record_reopens_gate() {
        let mut store = searching_store();
        store.add_pre_search(PreSearchRecord::pending(THREAD, 0, "q"));
        store.remove_pre_search(0);
        assert!(store.pre_search_for_round(0).is_none());
        assert!(store.should_wait_for_pre_search(0));
    }
}
