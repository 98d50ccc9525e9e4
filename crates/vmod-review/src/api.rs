//! Review tool operations.

use std::path::Path;

use async_trait::async_trait;

use vmod_models::{TranscriptModerationRecord, VideoFrameRecord, VideoReviewRecord};

use crate::error::ReviewApiResult;

/// Operations of the review tool used to upload one video review.
#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// Create reviews, returning their ids in request order.
    async fn create_video_reviews(
        &self,
        reviews: &[VideoReviewRecord],
    ) -> ReviewApiResult<Vec<String>>;

    /// Attach one batch of frames with its image archive.
    async fn add_video_frames(
        &self,
        review_id: &str,
        frames: &[VideoFrameRecord],
        archive: &Path,
    ) -> ReviewApiResult<()>;

    /// Attach the caption file text.
    async fn add_transcript(&self, review_id: &str, transcript: &str) -> ReviewApiResult<()>;

    async fn add_transcript_moderation_results(
        &self,
        review_id: &str,
        results: &[TranscriptModerationRecord],
    ) -> ReviewApiResult<()>;

    async fn publish_video_review(&self, review_id: &str) -> ReviewApiResult<()>;
}
