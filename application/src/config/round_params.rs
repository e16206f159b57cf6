//! Round parameters: use case loop control.
//!
//! [`RoundParams`] groups the static parameters that control how
//! [`RunRoundUseCase`](crate::use_cases::run_round::RunRoundUseCase) drives a
//! round. Staleness thresholds are domain policy and live in the store.

use roundtable_domain::Model;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Round driver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundParams {
    /// Model for the synthesis pass.
    pub moderator: Model,
    /// How often the pre-search gate is re-checked while it says wait.
    pub gate_poll_interval: Duration,
    /// Longest silence between two stream events before the stream is
    /// failed with `timeout`.
    pub stream_idle_timeout: Option<Duration>,
    /// Upper bound for the pre-search request itself.
    pub pre_search_timeout: Duration,
}

impl Default for RoundParams {
    fn default() -> Self {
        Self {
            moderator: Model::default_moderator(),
            gate_poll_interval: Duration::from_millis(250),
            stream_idle_timeout: Some(Duration::from_secs(120)),
            pre_search_timeout: Duration::from_secs(10),
        }
    }
}

impl RoundParams {
    // ==================== Builder Methods ====================

    pub fn with_moderator(mut self, model: Model) -> Self {
        self.moderator = model;
        self
    }

    pub fn with_gate_poll_interval(mut self, interval: Duration) -> Self {
        self.gate_poll_interval = interval;
        self
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn with_pre_search_timeout(mut self, timeout: Duration) -> Self {
        self.pre_search_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = RoundParams::default();
        assert_eq!(params.moderator, Model::ClaudeOpus45);
        assert_eq!(params.pre_search_timeout, Duration::from_secs(10));
        assert!(params.stream_idle_timeout.is_some());
    }

    #[test]
    fn test_builder() {
        let params = RoundParams::default()
            .with_moderator(Model::Gpt52)
            .with_stream_idle_timeout(None)
            .with_gate_poll_interval(Duration::from_millis(10));

        assert_eq!(params.moderator, Model::Gpt52);
        assert!(params.stream_idle_timeout.is_none());
        assert_eq!(params.gate_poll_interval, Duration::from_millis(10));
    }
}
