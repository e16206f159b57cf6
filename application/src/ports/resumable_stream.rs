//! Buffered stream lookup
//!
//! Streams outlive the client that opened them. After a reload the client
//! asks for the status of a stream by id and, if it is still running,
//! re-attaches to the buffered output instead of issuing the request again.

use super::participant_stream::{GatewayError, StreamHandle};
use async_trait::async_trait;
use roundtable_domain::StreamResumptionRecord;

/// Server-side status of a buffered stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Active,
    Completed,
    NotFound,
}

#[async_trait]
pub trait ResumableStreamPort: Send + Sync {
    /// Most recent stream recorded for a thread, if any.
    async fn latest_for_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<StreamResumptionRecord>, GatewayError>;

    async fn lookup(&self, stream_id: &str) -> Result<StreamStatus, GatewayError>;

    /// Replay the buffered output from the start, then follow the live stream.
    async fn resume(&self, stream_id: &str) -> Result<StreamHandle, GatewayError>;
}
