//! Worker error types.

use std::fmt::Display;

use thiserror::Error;

use vmod_models::{FrameNamingError, ReviewStage};

use crate::config::ConfigError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Malformed visual report: {0}")]
    MalformedReport(String),

    #[error("Review creation failed: {0}")]
    ReviewCreation(String),

    #[error("Attaching frames failed: {0}")]
    FrameAttach(String),

    #[error("Attaching transcript failed: {0}")]
    TranscriptAttach(String),

    #[error("Attaching transcript moderation results failed: {0}")]
    ModerationResultAttach(String),

    #[error("Publishing review failed: {0}")]
    Publish(String),

    #[error("Frame naming error: {0}")]
    FrameNaming(#[from] FrameNamingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Media error: {0}")]
    Media(#[from] vmod_media::MediaError),

    #[error("Moderation error: {0}")]
    Moderation(#[from] vmod_moderation::ModerationError),

    #[error("Review API error: {0}")]
    Review(#[from] vmod_review::ReviewApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn malformed_report(msg: impl Into<String>) -> Self {
        Self::MalformedReport(msg.into())
    }

    /// The error raised when `stage` fails with `cause`.
    pub fn stage_failed(stage: ReviewStage, cause: impl Display) -> Self {
        let cause = cause.to_string();
        match stage {
            ReviewStage::Create => Self::ReviewCreation(cause),
            ReviewStage::AttachFrames => Self::FrameAttach(cause),
            ReviewStage::AttachTranscript => Self::TranscriptAttach(cause),
            ReviewStage::AttachModerationResults => Self::ModerationResultAttach(cause),
            ReviewStage::Publish => Self::Publish(cause),
        }
    }

    /// The upload stage this error belongs to, if any.
    pub fn stage(&self) -> Option<ReviewStage> {
        match self {
            Self::ReviewCreation(_) => Some(ReviewStage::Create),
            Self::FrameAttach(_) => Some(ReviewStage::AttachFrames),
            Self::TranscriptAttach(_) => Some(ReviewStage::AttachTranscript),
            Self::ModerationResultAttach(_) => Some(ReviewStage::AttachModerationResults),
            Self::Publish(_) => Some(ReviewStage::Publish),
            _ => None,
        }
    }
}
