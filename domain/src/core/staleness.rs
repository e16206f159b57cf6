//! Age thresholds for records that may be abandoned mid-flight.
//!
//! None of these are timers: every check compares a record's `created_at`
//! against a caller-supplied `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Pending/streaming pre-search older than this no longer blocks the round.
pub const PRE_SEARCH_STALE_SECS: i64 = 10;
/// Pending/streaming analysis older than this is treated as failed.
pub const ANALYSIS_STALE_SECS: i64 = 60;
/// A resumable stream record older than this is ignored.
pub const STREAM_RESUMPTION_TTL_SECS: i64 = 60 * 60;

/// Staleness thresholds, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessPolicy {
    pub pre_search_stale_secs: i64,
    pub analysis_stale_secs: i64,
    pub stream_resumption_ttl_secs: i64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            pre_search_stale_secs: PRE_SEARCH_STALE_SECS,
            analysis_stale_secs: ANALYSIS_STALE_SECS,
            stream_resumption_ttl_secs: STREAM_RESUMPTION_TTL_SECS,
        }
    }
}

impl StalenessPolicy {
    pub fn is_pre_search_stale(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_older_than(created_at, now, self.pre_search_stale_secs)
    }

    pub fn is_analysis_stale(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_older_than(created_at, now, self.analysis_stale_secs)
    }

    pub fn is_resumption_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_older_than(created_at, now, self.stream_resumption_ttl_secs)
    }
}

fn is_older_than(created_at: DateTime<Utc>, now: DateTime<Utc>, secs: i64) -> bool {
    now.signed_duration_since(created_at) > Duration::seconds(secs)
}
