//! "At most once" guards keyed per round.
//!
//! Every trigger that must not fire twice for the same round (pre-search,
//! moderator creation, moderator stream, resumption attempt) goes through a
//! [`OnceSet::try_mark`]. The first call wins; duplicates get `false`.

mod once_set;

pub use once_set::OnceSet;

use serde::{Deserialize, Serialize};

/// Per-thread deduplication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupGuards {
    pre_search_triggered: OnceSet<u32>,
    moderator_created: OnceSet<u32>,
    moderator_stream_triggered: OnceSet<(String, u32)>,
    resumption_attempted: OnceSet<(u32, usize)>,
}

impl DedupGuards {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Pre-search ====================

    pub fn try_mark_pre_search_triggered(&mut self, round_number: u32) -> bool {
        self.pre_search_triggered.try_mark(round_number)
    }

    pub fn has_pre_search_triggered(&self, round_number: u32) -> bool {
        self.pre_search_triggered.contains(&round_number)
    }

    pub fn clear_pre_search_tracking(&mut self, round_number: u32) {
        self.pre_search_triggered.remove(&round_number);
    }

    // ==================== Moderator ====================

    pub fn try_mark_moderator_created(&mut self, round_number: u32) -> bool {
        self.moderator_created.try_mark(round_number)
    }

    pub fn has_moderator_been_created(&self, round_number: u32) -> bool {
        self.moderator_created.contains(&round_number)
    }

    pub fn try_mark_moderator_stream_triggered(&mut self, id: &str, round_number: u32) -> bool {
        self.moderator_stream_triggered
            .try_mark((id.to_string(), round_number))
    }

    pub fn has_moderator_stream_been_triggered(&self, id: &str, round_number: u32) -> bool {
        self.moderator_stream_triggered
            .contains(&(id.to_string(), round_number))
    }

    pub fn clear_moderator_tracking(&mut self, round_number: u32) {
        self.moderator_created.remove(&round_number);
        self.moderator_stream_triggered
            .retain(|(_, round)| *round != round_number);
    }

    // ==================== Resumption ====================

    pub fn try_mark_resumption_attempted(&mut self, round_number: u32, index: usize) -> bool {
        self.resumption_attempted.try_mark((round_number, index))
    }

    pub fn clear_resumption_tracking(&mut self, round_number: u32) {
        self.resumption_attempted
            .retain(|(round, _)| *round != round_number);
    }

    // ==================== Bulk ====================

    /// Forget everything tracked for one round (regeneration).
    pub fn clear_round(&mut self, round_number: u32) {
        self.clear_pre_search_tracking(round_number);
        self.clear_moderator_tracking(round_number);
        self.clear_resumption_tracking(round_number);
    }

    /// Forget everything (navigation / reset only).
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.pre_search_triggered.is_empty()
            && self.moderator_created.is_empty()
            && self.moderator_stream_triggered.is_empty()
            && self.resumption_attempted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_search_trigger_is_once_per_round() {
        let mut guards = DedupGuards::new();
        assert!(guards.try_mark_pre_search_triggered(0));
        assert!(!guards.try_mark_pre_search_triggered(0));
        assert!(guards.try_mark_pre_search_triggered(1));
    }

    #[test]
    fn moderator_stream_keyed_by_id_and_round() {
        let mut guards = DedupGuards::new();
        assert!(guards.try_mark_moderator_stream_triggered("t1", 0));
        assert!(!guards.try_mark_moderator_stream_triggered("t1", 0));
        assert!(guards.try_mark_moderator_stream_triggered("t2", 0));
        assert!(guards.try_mark_moderator_stream_triggered("t1", 1));
    }

    #[test]
    fn resumption_attempt_true_exactly_once_per_pair() {
        let mut guards = DedupGuards::new();
        assert!(guards.try_mark_resumption_attempted(0, 1));
        for _ in 0..5 {
            assert!(!guards.try_mark_resumption_attempted(0, 1));
        }
        assert!(guards.try_mark_resumption_attempted(0, 2));
        assert!(guards.try_mark_resumption_attempted(1, 1));
    }

    #[test]
    fn clear_round_only_touches_that_round() {
        let mut guards = DedupGuards::new();
        guards.try_mark_pre_search_triggered(0);
        guards.try_mark_pre_search_triggered(1);
        guards.try_mark_moderator_created(0);
        guards.try_mark_moderator_created(1);
        guards.try_mark_moderator_stream_triggered("t", 0);
        guards.try_mark_resumption_attempted(0, 0);

        guards.clear_round(0);

        assert!(!guards.has_pre_search_triggered(0));
        assert!(guards.has_pre_search_triggered(1));
        assert!(!guards.has_moderator_been_created(0));
        assert!(guards.has_moderator_been_created(1));
        assert!(!guards.has_moderator_stream_been_triggered("t", 0));
        assert!(guards.try_mark_resumption_attempted(0, 0));
    }

    #[test]
    fn clear_all_resets_every_guard() {
        let mut guards = DedupGuards::new();
        guards.try_mark_pre_search_triggered(0);
        guards.try_mark_moderator_created(0);
        guards.try_mark_resumption_attempted(0, 0);
        guards.clear_all();
        assert!(guards.is_empty());
    }
}
