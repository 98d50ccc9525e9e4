//! Review tool payloads and review lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::caption::ModeratedTerm;

/// Entity type of a video review.
pub const VIDEO_ENTITY_TYPE: &str = "Video";
/// Status a review is created with.
pub const REVIEW_STATUS_UNPUBLISHED: &str = "UnPublished";

/// Render a boolean the way the review tool expects metadata flags.
pub fn bool_value(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// A key/value metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataPair {
    pub key: String,
    pub value: String,
}

impl MetadataPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn flag(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, bool_value(value))
    }
}

/// Review creation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoReviewRecord {
    #[serde(rename = "Type")]
    pub entity_type: String,
    /// Content locator (streaming URL)
    pub content: String,
    pub content_id: String,
    pub callback_endpoint: Option<String>,
    pub metadata: Option<Vec<MetadataPair>>,
    pub status: String,
    pub video_frames: Option<Vec<VideoFrameRecord>>,
    pub timescale: Option<String>,
}

impl VideoReviewRecord {
    /// Create an unpublished video review record.
    pub fn unpublished(
        content: impl Into<String>,
        content_id: impl Into<String>,
        metadata: Option<Vec<MetadataPair>>,
    ) -> Self {
        Self {
            entity_type: VIDEO_ENTITY_TYPE.to_string(),
            content: content.into(),
            content_id: content_id.into(),
            callback_endpoint: None,
            metadata,
            status: REVIEW_STATUS_UNPUBLISHED.to_string(),
            video_frames: None,
            timescale: None,
        }
    }
}

/// One frame in an attach-frames payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoFrameRecord {
    /// Millisecond timestamp as text
    pub timestamp: String,
    /// File name of the frame image inside the batch archive
    pub frame_image: String,
    pub metadata: Vec<MetadataPair>,
    pub reviewer_result_tags: Vec<MetadataPair>,
}

/// Flagged terms for one caption cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptModerationRecord {
    /// Cue start in milliseconds, as text
    pub timestamp: String,
    pub terms: Vec<ModeratedTerm>,
}

/// Upload stages of a review, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    Create,
    AttachFrames,
    AttachTranscript,
    AttachModerationResults,
    Publish,
}

impl ReviewStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStage::Create => "create",
            ReviewStage::AttachFrames => "attach_frames",
            ReviewStage::AttachTranscript => "attach_transcript",
            ReviewStage::AttachModerationResults => "attach_moderation_results",
            ReviewStage::Publish => "publish",
        }
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one video's review upload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    NotStarted,
    Created {
        review_id: String,
    },
    FramesAttached {
        review_id: String,
    },
    TranscriptAttached {
        review_id: String,
    },
    Published {
        review_id: String,
    },
    Failed {
        stage: ReviewStage,
        cause: String,
    },
}

impl ReviewState {
    /// Review id, once one has been created.
    pub fn review_id(&self) -> Option<&str> {
        match self {
            ReviewState::Created { review_id }
            | ReviewState::FramesAttached { review_id }
            | ReviewState::TranscriptAttached { review_id }
            | ReviewState::Published { review_id } => Some(review_id),
            ReviewState::NotStarted | ReviewState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReviewState::Published { .. } | ReviewState::Failed { .. }
        )
    }
}
