//! Static web search provider

use async_trait::async_trait;
use roundtable_application::ports::web_search::{SearchError, WebSearchPort};
use roundtable_domain::{PreSearchPayload, SearchResult};
use std::time::Duration;

/// Answers every query with a fixed set of sources.
pub struct StaticSearchProvider {
    sources: Vec<SearchResult>,
    latency: Duration,
    unavailable: bool,
}

impl Default for StaticSearchProvider {
    fn default() -> Self {
        Self {
            sources: vec![
                SearchResult {
                    title: "The Rust Programming Language".to_string(),
                    url: "https://doc.rust-lang.org/book/".to_string(),
                    snippet: "Ownership, borrowing and lifetimes explained.".to_string(),
                },
                SearchResult {
                    title: "Rust Reference".to_string(),
                    url: "https://doc.rust-lang.org/reference/".to_string(),
                    snippet: "The primary reference for the Rust language.".to_string(),
                },
            ],
            latency: Duration::from_millis(50),
            unavailable: false,
        }
    }
}

impl StaticSearchProvider {
    pub fn new(sources: Vec<SearchResult>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every search, to exercise the degraded path.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl WebSearchPort for StaticSearchProvider {
    async fn search(&self, query: &str) -> Result<PreSearchPayload, SearchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.unavailable {
            return Err(SearchError::Unavailable("static provider disabled".to_string()));
        }
        Ok(PreSearchPayload {
            queries: vec![query.trim().to_string()],
            results: self.sources.clone(),
            summary: Some(format!("{} sources found", self.sources.len())),
        })
    }
}
