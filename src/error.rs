//! Error types for workflow-guard operations

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token acquisition failed for client registration '{registration}': {message}")]
    TokenAcquisition { registration: String, message: String },

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Response body exceeds the in-memory limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// HTTP status for hosts that surface the failure over HTTP
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            GuardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GuardError::TokenAcquisition { .. }
            | GuardError::Transport(_)
            | GuardError::BodyTooLarge { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the workflow engine may reasonably retry the call
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GuardError::TokenAcquisition { .. } | GuardError::Transport(_)
        )
    }
}
