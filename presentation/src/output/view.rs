//! Serializable snapshot of one round
//!
//! Formatters read rounds through this view rather than the store, so the
//! JSON output has a stable shape.

use roundtable_application::ChatStore;
use roundtable_domain::{FlowState, Message, RecordStatus};
use serde::Serialize;

/// One participant answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerView {
    pub index: usize,
    pub model: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerView {
    pub fn succeeded(&self) -> bool {
        self.error_category.is_none()
    }

    fn from_message(message: &Message) -> Option<Self> {
        let index = message.participant_index()?;
        Some(Self {
            index,
            model: message.model().map(|m| m.to_string()).unwrap_or_default(),
            text: message.text(),
            error_category: message.error.as_ref().map(|e| e.category.to_string()),
            error: message.error.as_ref().map(|e| e.message.clone()),
        })
    }
}

/// Web search that ran before the participants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    pub status: RecordStatus,
    pub queries: Vec<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a reader needs about one round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundView {
    pub thread_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slug: String,
    pub round_number: u32,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchView>,
    pub answers: Vec<AnswerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_model: Option<String>,
    pub moderator_status: Option<RecordStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
    pub flow_state: FlowState,
}

impl RoundView {
    /// Snapshot `round_number` from the store. `None` when no thread is loaded.
    pub fn from_store(store: &ChatStore, round_number: u32) -> Option<Self> {
        let state = store.state();
        let thread = state.thread.as_ref()?;
        let messages = store.messages_in_round(round_number);

        let question = messages
            .iter()
            .find(|m| m.is_user())
            .map(|m| m.text())
            .unwrap_or_default();

        let mut answers: Vec<AnswerView> = messages
            .iter()
            .filter_map(|m| AnswerView::from_message(m))
            .collect();
        answers.sort_by_key(|a| a.index);

        let moderator = messages.iter().find(|m| m.is_moderator());
        let analysis = store.analysis_for_round(round_number);
        let synthesis = analysis
            .and_then(|a| a.payload.as_ref())
            .map(|p| p.summary.clone())
            .or_else(|| moderator.map(|m| m.text()).filter(|t| !t.is_empty()));

        let search = store.pre_search_for_round(round_number).map(|record| SearchView {
            status: record.status,
            queries: record
                .payload
                .as_ref()
                .map(|p| p.queries.clone())
                .unwrap_or_default(),
            sources: record
                .payload
                .as_ref()
                .map(|p| p.results.iter().map(|r| r.url.clone()).collect())
                .unwrap_or_default(),
            error: record.error_message.clone(),
        });

        Some(Self {
            thread_id: thread.id.clone(),
            title: thread.title.clone(),
            slug: thread.slug.clone(),
            round_number,
            question,
            search,
            answers,
            moderator_model: moderator.and_then(|m| m.model()).map(|m| m.to_string()),
            moderator_status: analysis.map(|a| a.status),
            synthesis,
            flow_state: store.flow_state(),
        })
    }

    pub fn failed_answers(&self) -> impl Iterator<Item = &AnswerView> {
        self.answers.iter().filter(|a| !a.succeeded())
    }
}
