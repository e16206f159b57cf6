//! Staleness thresholds from TOML (`[timeouts]` section)

use roundtable_domain::{ConfigIssue, ConfigIssueCode, StalenessPolicy};
use serde::{Deserialize, Serialize};

/// Age thresholds in seconds. These are compared against record creation
/// times; nothing here schedules a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimeoutsConfig {
    pub pre_search_stale_secs: i64,
    pub analysis_stale_secs: i64,
    pub stream_resumption_ttl_secs: i64,
}

impl Default for FileTimeoutsConfig {
    fn default() -> Self {
        let policy = StalenessPolicy::default();
        Self {
            pre_search_stale_secs: policy.pre_search_stale_secs,
            analysis_stale_secs: policy.analysis_stale_secs,
            stream_resumption_ttl_secs: policy.stream_resumption_ttl_secs,
        }
    }
}

impl FileTimeoutsConfig {
    /// Convert to the domain policy. Non-positive values fall back to the
    /// default for that field and are reported.
    pub fn to_policy(&self) -> (StalenessPolicy, Vec<ConfigIssue>) {
        let defaults = StalenessPolicy::default();
        let mut issues = Vec::new();
        let mut pick = |field: &str, value: i64, fallback: i64| {
            if value > 0 {
                value
            } else {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroTimeout {
                        field: field.to_string(),
                    },
                    format!("timeouts.{}: must be greater than zero", field),
                ));
                fallback
            }
        };
        let policy = StalenessPolicy {
            pre_search_stale_secs: pick(
                "pre_search_stale_secs",
                self.pre_search_stale_secs,
                defaults.pre_search_stale_secs,
            ),
            analysis_stale_secs: pick(
                "analysis_stale_secs",
                self.analysis_stale_secs,
                defaults.analysis_stale_secs,
            ),
            stream_resumption_ttl_secs: pick(
                "stream_resumption_ttl_secs",
                self.stream_resumption_ttl_secs,
                defaults.stream_resumption_ttl_secs,
            ),
        };
        (policy, issues)
    }
}
