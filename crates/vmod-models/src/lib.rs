//! Shared data models for the video moderation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Frame events and their scores
//! - Caption segments and text screening results
//! - The raw visual moderation report
//! - Review tool payloads and review lifecycle state
//! - Visual moderation job outputs

pub mod asset;
pub mod caption;
pub mod frame;
pub mod report;
pub mod review;
pub mod score;
pub mod thresholds;

// Re-export common types
pub use asset::{StreamingUrls, VisualModerationAsset};
pub use caption::{CaptionSegment, ModeratedTerm, TextClassification, TranscriptBundle};
pub use frame::{FrameEvent, FrameName, FrameNamingError};
pub use report::{RawFrameRecord, RawTimeScale, ReportFragment, VisualReport};
pub use review::{
    bool_value, MetadataPair, ReviewStage, ReviewState, TranscriptModerationRecord,
    VideoFrameRecord, VideoReviewRecord, REVIEW_STATUS_UNPUBLISHED, VIDEO_ENTITY_TYPE,
};
pub use score::{Score, ScoreParseError};
pub use thresholds::{FrameThresholds, TextThresholds};
