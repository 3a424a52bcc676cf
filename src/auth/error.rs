use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Per-request authorization outcomes that deny access
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// No authentication token was provided
    #[error("Missing authentication token")]
    MissingToken,

    /// Token verification failed for the given reason
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Principal holds none of the roles the method requires
    #[error("Insufficient role. Required one of: {}", .0.join(", "))]
    InsufficientRole(Vec<String>),
}

impl AuthorizationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationError::MissingToken | AuthorizationError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthorizationError::InsufficientRole(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
