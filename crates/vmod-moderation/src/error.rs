//! Moderation client error types.

use thiserror::Error;

pub type ModerationResult<T> = Result<T, ModerationError>;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Moderation job {job} ended in state {state}: {message}")]
    JobFailed {
        job: String,
        state: String,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("Caption parse error: {0}")]
    CaptionParse(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModerationError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build a status error from a non-success response, consuming its body.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Status { status, body }
    }
}
