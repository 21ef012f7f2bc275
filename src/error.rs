use thiserror::Error;
use warp::http::StatusCode;

/// Errors surfaced to callers of the story service.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoryError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Detail is logged, never shown to the caller.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl StoryError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoryError::Validation(_) => StatusCode::BAD_REQUEST,
            StoryError::NotFound(_) => StatusCode::NOT_FOUND,
            StoryError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to put in a response body.
    pub fn public_message(&self) -> String {
        match self {
            StoryError::Validation(m) | StoryError::NotFound(m) => m.clone(),
            StoryError::Unexpected(_) => "Server error occurred".to_string(),
        }
    }
}

/// Failures of the remote completion call. Never leaves the generation layer.
#[derive(Debug, Error, Clone)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response contained no completion")]
    EmptyResponse,
}
