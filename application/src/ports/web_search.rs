//! Web search port used by the pre-search step.

use async_trait::async_trait;
use roundtable_domain::PreSearchPayload;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search provider unavailable: {0}")]
    Unavailable(String),

    #[error("Search timed out")]
    Timeout,

    #[error("Search failed: {0}")]
    Failed(String),
}

/// Runs the search for a round's user query.
#[async_trait]
pub trait WebSearchPort: Send + Sync {
    async fn search(&self, query: &str) -> Result<PreSearchPayload, SearchError>;
}
