//! Review API error types.

use thiserror::Error;

pub type ReviewApiResult<T> = Result<T, ReviewApiError>;

#[derive(Debug, Error)]
pub enum ReviewApiError {
    #[error("Review API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewApiError {
    /// Build a status error from a non-success response, consuming its body.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Status { status, body }
    }

    /// Status code of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
