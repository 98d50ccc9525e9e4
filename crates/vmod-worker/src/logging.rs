//! Structured per-video logging.
//!
//! Every pipeline event carries the video name and operation, so that logs of
//! a batch run can be filtered down to one video.

use std::fmt::Display;

use tracing::{error, info, warn, Span};

use vmod_models::ReviewStage;

/// Logger stamping events with the video being processed.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    video: String,
    operation: String,
}

impl VideoLogger {
    /// Create a logger for a video and operation (e.g. "moderation", "review_upload").
    pub fn new(video: impl Into<String>, operation: &str) -> Self {
        Self {
            video: video.into(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video = %self.video,
            operation = %self.operation,
            "Video started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video = %self.video,
            operation = %self.operation,
            "Video progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video = %self.video,
            operation = %self.operation,
            "Video warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video = %self.video,
            operation = %self.operation,
            "Video error: {}", message
        );
    }

    /// Log a failed review upload stage before its error propagates.
    pub fn log_stage_failure(&self, stage: ReviewStage, review_id: Option<&str>, cause: &dyn Display) {
        error!(
            video = %self.video,
            operation = %self.operation,
            stage = %stage,
            review_id = review_id.unwrap_or("-"),
            "Review stage failed: {}", cause
        );
    }

    /// Log one uploaded frame batch.
    pub fn log_batch(&self, review_id: &str, batch: usize, total: usize, frames: usize) {
        info!(
            video = %self.video,
            operation = %self.operation,
            review_id,
            batch,
            "Attached frame batch {}/{} ({} frames)", batch + 1, total, frames
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video = %self.video,
            operation = %self.operation,
            "Video completed: {}", message
        );
    }

    pub fn video(&self) -> &str {
        &self.video
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering one video's pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "video",
            video = %self.video,
            operation = %self.operation
        )
    }
}
