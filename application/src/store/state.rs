//! Snapshot of everything the store owns for the loaded thread.

use roundtable_domain::orchestration::round::current_round_number;
use roundtable_domain::thread::entities::enabled_participants;
use roundtable_domain::{
    AnalysisRecord, ChatMode, DedupGuards, Message, Participant, ParticipantOrchestrator,
    PreSearchRecord, ScreenMode, StreamResumptionRecord, Thread,
};
use std::collections::BTreeSet;

/// Store contents. Replaced wholesale on thread switch or reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    // ==================== Entities ====================
    pub thread: Option<Thread>,
    /// Sorted by priority.
    pub participants: Vec<Participant>,
    /// Sorted by round, then user / participants by index / moderator.
    pub messages: Vec<Message>,
    pub pre_searches: Vec<PreSearchRecord>,
    pub analyses: Vec<AnalysisRecord>,
    pub stream_resumption: Option<StreamResumptionRecord>,

    // ==================== Form preferences (before a thread exists) ====================
    pub chat_mode: ChatMode,
    pub enable_web_search: bool,
    pub screen_mode: ScreenMode,

    // ==================== Round flags ====================
    pub is_streaming: bool,
    pub orchestrator: ParticipantOrchestrator,
    pub streaming_round_number: Option<u32>,
    pub is_moderator_streaming: bool,
    pub is_creating_moderator: bool,
    pub is_creating_thread: bool,
    pub is_regenerating: bool,
    pub regenerating_round_number: Option<u32>,
    /// Operation-level error (connection loss, ...). Message errors live on messages.
    pub error: Option<String>,
    pub is_waiting_for_changelog: bool,
    pub pending_message: Option<String>,
    pub has_sent_pending_message: bool,
    pub waiting_to_start_streaming: bool,
    pub has_navigated: bool,
    /// Participant indices whose entrance animation has not finished.
    pub pending_animations: BTreeSet<usize>,

    // ==================== Dedup ====================
    pub guards: DedupGuards,
}

impl StoreState {
    pub fn current_participant_index(&self) -> usize {
        self.orchestrator.current_index()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.id.as_str())
    }

    /// Web search flag of the loaded thread, or the form preference.
    pub fn web_search_enabled(&self) -> bool {
        self.thread
            .as_ref()
            .map_or(self.enable_web_search, |t| t.enable_web_search)
    }

    pub fn chat_mode(&self) -> ChatMode {
        self.thread.as_ref().map_or(self.chat_mode, |t| t.mode)
    }

    /// Enabled participants in speaking order; message indices point here.
    pub fn enabled_participants(&self) -> Vec<&Participant> {
        enabled_participants(&self.participants)
    }

    pub fn participant_count(&self) -> usize {
        self.enabled_participants().len()
    }

    pub fn participant_at(&self, index: usize) -> Option<&Participant> {
        self.enabled_participants().get(index).copied()
    }

    /// Round of the latest message. The one round number used for gating.
    pub fn current_round_number(&self) -> u32 {
        current_round_number(&self.messages)
    }

    /// Participants or moderator are producing output for a round.
    pub fn is_round_in_progress(&self) -> bool {
        self.is_streaming || self.is_moderator_streaming || self.is_creating_moderator
    }

    /// Clear every streaming-related flag in one go.
    pub(crate) fn clear_streaming_flags(&mut self) {
        self.is_streaming = false;
        self.is_moderator_streaming = false;
        self.is_creating_moderator = false;
        self.orchestrator.reset();
        self.streaming_round_number = None;
        self.waiting_to_start_streaming = false;
    }
}
