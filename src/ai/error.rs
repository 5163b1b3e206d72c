use thiserror::Error;

pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

const RETRYABLE_PHRASES: &[&str] = &["quota", "rate limit", "too many requests"];

/// Failure reported by the inference service or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub status: Option<u16>,
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Rate limiting and temporary unavailability are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        if matches!(
            self.status,
            Some(STATUS_TOO_MANY_REQUESTS) | Some(STATUS_SERVICE_UNAVAILABLE)
        ) {
            return true;
        }
        let msg = self.message.to_lowercase();
        RETRYABLE_PHRASES.iter().any(|p| msg.contains(p))
    }

    /// Text safe to show the end user. Pure function of the error.
    pub fn user_message(&self) -> String {
        match self.status {
            Some(STATUS_TOO_MANY_REQUESTS) if self.message.to_lowercase().contains("daily") => {
                "Daily AI quota exhausted. Please try again tomorrow.".to_string()
            }
            Some(STATUS_TOO_MANY_REQUESTS) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Some(STATUS_SERVICE_UNAVAILABLE) => {
                "The AI service is temporarily unavailable. Retrying...".to_string()
            }
            _ if !self.message.trim().is_empty() => self.message.clone(),
            _ => "Request failed. Please try again.".to_string(),
        }
    }
}
