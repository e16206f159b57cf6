//! Progress notification port
//!
//! Defines the interface for reporting progress while a round runs.

use roundtable_domain::Model;

/// Callback for progress updates during a round
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait RoundProgressNotifier: Send + Sync {
    /// Called when a round starts
    fn on_round_start(&self, round_number: u32, participant_count: usize);

    /// Called when a participant finishes, successfully or not
    fn on_participant_complete(&self, index: usize, model: &Model, success: bool);

    /// Called when the round (participants and moderator) is done
    fn on_round_complete(&self, round_number: u32);

    // ==================== Optional Callbacks ====================

    fn on_pre_search_start(&self, _round_number: u32) {}

    fn on_pre_search_complete(&self, _round_number: u32, _success: bool) {}

    /// Called when a participant's stream opens.
    fn on_participant_start(&self, _index: usize, _model: &Model) {}

    /// Called for each text chunk from a participant.
    fn on_participant_chunk(&self, _index: usize, _chunk: &str) {}

    fn on_moderator_start(&self, _model: &Model) {}

    fn on_moderator_chunk(&self, _chunk: &str) {}

    fn on_moderator_complete(&self, _success: bool) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RoundProgressNotifier for NoProgress {
    fn on_round_start(&self, _round_number: u32, _participant_count: usize) {}
    fn on_participant_complete(&self, _index: usize, _model: &Model, _success: bool) {}
    fn on_round_complete(&self, _round_number: u32) {}
}
