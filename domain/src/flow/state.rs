use crate::core::status::RecordStatus;
use serde::{Deserialize, Serialize};

/// Which screen the conversation is shown on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMode {
    /// Landing screen where a new thread is started.
    #[default]
    Overview,
    /// A thread's own screen.
    Thread,
    /// Read-only shared view.
    Public,
}

/// Discrete flow state of the current round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    #[default]
    Idle,
    CreatingThread,
    StreamingParticipants,
    CreatingModerator,
    StreamingModerator,
    Navigating,
    Complete,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Idle => "IDLE",
            FlowState::CreatingThread => "CREATING_THREAD",
            FlowState::StreamingParticipants => "STREAMING_PARTICIPANTS",
            FlowState::CreatingModerator => "CREATING_MODERATOR",
            FlowState::StreamingModerator => "STREAMING_MODERATOR",
            FlowState::Navigating => "NAVIGATING",
            FlowState::Complete => "COMPLETE",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot the flow decision is computed from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowContext {
    pub thread_id: Option<String>,
    pub thread_slug: Option<String>,
    pub has_ai_generated_title: bool,
    pub screen_mode: ScreenMode,
    pub has_navigated: bool,
    pub is_creating_thread: bool,
    pub is_streaming: bool,
    pub is_creating_moderator: bool,
    pub is_moderator_streaming: bool,
    pub round_number: u32,
    /// Analysis record status for `round_number`, if one exists.
    pub moderator_status: Option<RecordStatus>,
    /// A moderator message exists for `round_number`.
    pub has_moderator_message: bool,
    /// That moderator message is terminal.
    pub moderator_message_complete: bool,
    pub participant_count: usize,
    /// Every participant has a terminal message for `round_number`.
    pub all_participants_responded: bool,
    pub pending_animations: usize,
}

impl FlowContext {
    fn moderator_complete(&self) -> bool {
        self.moderator_status == Some(RecordStatus::Complete) || self.moderator_message_complete
    }

    fn moderator_in_progress(&self) -> bool {
        self.is_moderator_streaming
            || self.moderator_status.is_some_and(|s| s.is_in_flight())
            || (self.has_moderator_message && !self.moderator_message_complete)
    }

    fn has_any_moderator(&self) -> bool {
        self.has_moderator_message || self.moderator_status.is_some()
    }
}

/// Compute the flow state. First match wins:
///
/// 1. navigation already performed → `COMPLETE`
/// 2. synthesis complete, title ready, on overview → `NAVIGATING`
/// 3. synthesis in progress → `STREAMING_MODERATOR`
/// 4. all participants done, no synthesis yet, not creating one, no pending
///    animations → `CREATING_MODERATOR`
/// 5. participants streaming, no synthesis message → `STREAMING_PARTICIPANTS`
/// 6. thread creation in flight → `CREATING_THREAD`
/// 7. otherwise `IDLE`
pub fn compute_flow_state(ctx: &FlowContext) -> FlowState {
    if ctx.has_navigated {
        return FlowState::Complete;
    }
    if ctx.moderator_complete()
        && ctx.has_ai_generated_title
        && ctx.screen_mode == ScreenMode::Overview
    {
        return FlowState::Navigating;
    }
    if ctx.moderator_in_progress() {
        return FlowState::StreamingModerator;
    }
    if ctx.all_participants_responded
        && ctx.participant_count > 0
        && !ctx.has_any_moderator()
        && !ctx.is_creating_moderator
        && ctx.pending_animations == 0
    {
        return FlowState::CreatingModerator;
    }
    if ctx.is_streaming && !ctx.has_moderator_message {
        return FlowState::StreamingParticipants;
    }
    if ctx.is_creating_thread {
        return FlowState::CreatingThread;
    }
    FlowState::Idle
}
