//! Snapshot for the flow state machine.

use super::ChatStore;
use roundtable_domain::flow::compute_flow_state;
use roundtable_domain::orchestration::participants::is_round_complete;
use roundtable_domain::orchestration::round::moderator_message;
use roundtable_domain::{FlowContext, FlowState};

impl ChatStore {
    /// Build the flow context for the round being worked on.
    ///
    /// "All participants responded" only counts for the round this session
    /// staged; a finished round loaded from history never re-triggers the
    /// moderator on its own.
    pub fn flow_context(&self) -> FlowContext {
        let s = &self.state;
        let round_number = s
            .streaming_round_number
            .unwrap_or_else(|| s.current_round_number());
        let participant_count = s.participant_count();
        let moderator = moderator_message(&s.messages, round_number);
        let analysis = self.analysis_for_round(round_number);

        FlowContext {
            thread_id: s.thread.as_ref().map(|t| t.id.clone()),
            thread_slug: s.thread.as_ref().map(|t| t.slug.clone()),
            has_ai_generated_title: s.thread.as_ref().is_some_and(|t| t.is_ai_generated_title),
            screen_mode: s.screen_mode,
            has_navigated: s.has_navigated,
            is_creating_thread: s.is_creating_thread,
            is_streaming: s.is_streaming,
            is_creating_moderator: s.is_creating_moderator,
            is_moderator_streaming: s.is_moderator_streaming,
            round_number,
            moderator_status: analysis.map(|a| a.status),
            has_moderator_message: moderator.is_some(),
            moderator_message_complete: moderator.is_some_and(|m| m.is_terminal()),
            participant_count,
            all_participants_responded: s.streaming_round_number == Some(round_number)
                && is_round_complete(&s.messages, round_number, participant_count),
            pending_animations: s.pending_animations.len(),
        }
    }

    pub fn flow_state(&self) -> FlowState {
        compute_flow_state(&self.flow_context())
    }
}
