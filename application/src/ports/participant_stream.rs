//! Participant stream port
//!
//! The submit contract: given the assembled context, a model answers with a
//! token stream that ends in a finish reason or a categorized error.

use async_trait::async_trait;
use roundtable_domain::{ErrorCategory, MessageError, Model, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur before or while streaming a model response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Transport closed")]
    TransportClosed,
}

impl GatewayError {
    /// Category attached to the failed message.
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::RateLimited(_) => ErrorCategory::RateLimit,
            GatewayError::ModelNotAvailable(_) => ErrorCategory::ModelUnavailable,
            GatewayError::ModelError(_) => ErrorCategory::ModelError,
            GatewayError::ConnectionError(_)
            | GatewayError::StreamNotFound(_)
            | GatewayError::TransportClosed => ErrorCategory::NetworkError,
            GatewayError::Timeout => ErrorCategory::Timeout,
            GatewayError::InvalidRequest(_) => ErrorCategory::ValidationError,
            GatewayError::ServerError(_) => ErrorCategory::ServerError,
        }
    }

    pub fn to_message_error(&self) -> MessageError {
        MessageError::new(self.category(), self.to_string())
    }
}

/// One participant turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRequest {
    pub thread_id: String,
    pub round_number: u32,
    pub participant_index: usize,
    pub participant_id: String,
    pub model: Model,
    pub system_prompt: String,
    pub prompt: String,
}

impl ParticipantRequest {
    /// Stream id shared with the message this turn produces.
    pub fn stream_id(&self) -> String {
        roundtable_domain::message::identity::stream_id(
            &self.thread_id,
            self.round_number,
            self.participant_index,
        )
    }
}

/// The synthesis pass for a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorRequest {
    pub thread_id: String,
    pub round_number: u32,
    pub model: Model,
    pub system_prompt: String,
    pub prompt: String,
}

/// Handle for receiving streaming events.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`. A channel that closes without a
/// terminal event reads as a finish without reason, which the store turns
/// into `silent_failure` when no text arrived.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Handle over a fixed list of events.
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event.
            let _ = tx.try_send(event);
        }
        Self::new(rx)
    }

    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, MessageError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Reasoning(_) => {}
                StreamEvent::Finished(_) => break,
                StreamEvent::Failed(error) => return Err(error),
            }
        }
        Ok(full_text)
    }
}

/// Port for streaming participant and moderator answers
#[async_trait]
pub trait ParticipantStreamPort: Send + Sync {
    /// Open the stream for one participant turn.
    async fn stream_participant(
        &self,
        request: &ParticipantRequest,
    ) -> Result<StreamHandle, GatewayError>;

    /// Open the moderator stream.
    async fn stream_moderator(&self, request: &ModeratorRequest)
    -> Result<StreamHandle, GatewayError>;
}
