//! [`StreamEvent`] is one item of a participant or moderator token stream,
//! bridging the transport (infrastructure) to the store (application).

use crate::message::entities::FinishReason;
use crate::message::error::MessageError;

/// An event in a streaming model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),
    /// A reasoning chunk, kept apart from the answer text.
    Reasoning(String),
    /// Normal end of stream. `None` means the transport gave no reason.
    Finished(Option<FinishReason>),
    /// The stream failed with a categorized error.
    Failed(MessageError),
}

impl StreamEvent {
    /// Returns the text content if this is a Delta event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Finished(_) | StreamEvent::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::error::ErrorCategory;

    #[test]
    fn delta_text_returns_content() {
        let event = StreamEvent::Delta("hello".to_string());
        assert_eq!(event.text(), Some("hello"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn finished_and_failed_are_terminal() {
        assert!(StreamEvent::Finished(Some(FinishReason::Stop)).is_terminal());
        assert!(StreamEvent::Finished(None).is_terminal());
        let failed = StreamEvent::Failed(MessageError::from_category(ErrorCategory::Timeout));
        assert!(failed.is_terminal());
        assert_eq!(failed.text(), None);
    }

    #[test]
    fn reasoning_is_not_text() {
        let event = StreamEvent::Reasoning("thinking".to_string());
        assert_eq!(event.text(), None);
        assert!(!event.is_terminal());
    }
}
