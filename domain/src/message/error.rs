//! Error categories surfaced on failed messages.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Why a participant or moderator stream failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    RateLimit,
    ModelUnavailable,
    ModelError,
    NetworkError,
    Timeout,
    ValidationError,
    ServerError,
    /// Stream ended without text and without a finish reason.
    SilentFailure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::ModelUnavailable => "model_unavailable",
            ErrorCategory::ModelError => "model_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::ValidationError => "validation_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::SilentFailure => "silent_failure",
        }
    }

    /// Default user-facing text for a category.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCategory::RateLimit => "Rate limit reached, try again shortly",
            ErrorCategory::ModelUnavailable => "Model is currently unavailable",
            ErrorCategory::ModelError => "Model returned an error",
            ErrorCategory::NetworkError => "Network connection failed",
            ErrorCategory::Timeout => "Model took too long to respond",
            ErrorCategory::ValidationError => "Request was rejected as invalid",
            ErrorCategory::ServerError => "Server error while generating a response",
            ErrorCategory::SilentFailure => "Model returned an empty response",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rate_limit" => Ok(ErrorCategory::RateLimit),
            "model_unavailable" => Ok(ErrorCategory::ModelUnavailable),
            "model_error" => Ok(ErrorCategory::ModelError),
            "network_error" => Ok(ErrorCategory::NetworkError),
            "timeout" => Ok(ErrorCategory::Timeout),
            "validation_error" => Ok(ErrorCategory::ValidationError),
            "server_error" => Ok(ErrorCategory::ServerError),
            "silent_failure" => Ok(ErrorCategory::SilentFailure),
            other => Err(DomainError::UnknownErrorCategory(other.to_string())),
        }
    }
}

/// Error attached to the message that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageError {
    pub category: ErrorCategory,
    pub message: String,
}

impl MessageError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn from_category(category: ErrorCategory) -> Self {
        Self::new(category, category.default_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for category in [
            ErrorCategory::RateLimit,
            ErrorCategory::ModelUnavailable,
            ErrorCategory::ModelError,
            ErrorCategory::NetworkError,
            ErrorCategory::Timeout,
            ErrorCategory::ValidationError,
            ErrorCategory::ServerError,
            ErrorCategory::SilentFailure,
        ] {
            assert_eq!(category.as_str().parse::<ErrorCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_category() {
        let err = "quota".parse::<ErrorCategory>().unwrap_err();
        assert_eq!(err, DomainError::UnknownErrorCategory("quota".to_string()));
    }

    #[test]
    fn test_from_category_uses_default_text() {
        let error = MessageError::from_category(ErrorCategory::RateLimit);
        assert_eq!(error.message, "Rate limit reached, try again shortly");
    }
}
