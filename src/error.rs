use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed completion stream: {0}")]
    Stream(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl AssistantError {
    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self::InvalidEvent(reason.into())
    }

    /// Errors the user can fix by retrying the same trigger later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Stream(_) => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Provider {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => Self::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(e: serde_json::Error) -> Self {
        Self::Stream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AssistantError::Network("reset".into()).is_retryable());
        assert!(
            AssistantError::Provider {
                status: 503,
                message: "busy".into()
            }
            .is_retryable()
        );
        assert!(
            !AssistantError::Provider {
                status: 401,
                message: "bad key".into()
            }
            .is_retryable()
        );
        assert!(!AssistantError::MissingApiKey.is_retryable());
    }

    #[test]
    fn test_json_error_maps_to_stream() {
        let err: AssistantError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, AssistantError::Stream(_)));
    }
}
