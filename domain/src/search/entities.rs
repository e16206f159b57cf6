//! Pre-search records and their payload

use crate::core::status::RecordStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single web result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Structured payload of a completed pre-search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreSearchPayload {
    pub queries: Vec<String>,
    pub results: Vec<SearchResult>,
    pub summary: Option<String>,
}

impl PreSearchPayload {
    /// Text block appended to participant context.
    pub fn as_context(&self) -> String {
        let mut out = String::from("Web search results:\n");
        for (i, result) in self.results.iter().enumerate() {
            out.push_str(&format!(
                "[{}] {} ({})\n{}\n",
                i + 1,
                result.title,
                result.url,
                result.snippet
            ));
        }
        if let Some(summary) = &self.summary {
            out.push_str(&format!("Summary: {}\n", summary));
        }
        out
    }
}

/// Pre-search for one round (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreSearchRecord {
    pub id: String,
    pub thread_id: String,
    pub round_number: u32,
    pub user_query: String,
    pub status: RecordStatus,
    pub payload: Option<PreSearchPayload>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PreSearchRecord {
    pub fn pending(
        thread_id: impl Into<String>,
        round_number: u32,
        user_query: impl Into<String>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: format!("{}_r{}_presearch", thread_id, round_number),
            thread_id,
            round_number,
            user_query: user_query.into(),
            status: RecordStatus::Pending,
            payload: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }
}
