//! Frame event models.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::score::Score;

/// Errors raised when binding frame names to a review.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameNamingError {
    #[error("frame {ordinal} is already bound to review {review_id}")]
    AlreadyBound { ordinal: u32, review_id: String },

    #[error("review id must not be empty")]
    EmptyReviewId,
}

/// Name of a frame image, derived from its extraction ordinal.
///
/// Provisional names render as `_{ordinal}.jpg`; once a review exists the
/// name is bound and renders as `{review_id}_{ordinal}.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameName {
    ordinal: u32,
    review_id: Option<String>,
}

impl FrameName {
    /// Create a provisional name for a 1-based extraction ordinal.
    pub fn provisional(ordinal: u32) -> Self {
        Self {
            ordinal,
            review_id: None,
        }
    }

    /// The 1-based extraction ordinal.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// The review this name is bound to, if any.
    pub fn review_id(&self) -> Option<&str> {
        self.review_id.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.review_id.is_some()
    }

    /// Prefix the name with a review id. A name can be bound only once.
    pub fn bind(&mut self, review_id: &str) -> Result<(), FrameNamingError> {
        if review_id.is_empty() {
            return Err(FrameNamingError::EmptyReviewId);
        }
        if let Some(existing) = &self.review_id {
            return Err(FrameNamingError::AlreadyBound {
                ordinal: self.ordinal,
                review_id: existing.clone(),
            });
        }
        self.review_id = Some(review_id.to_string());
        Ok(())
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.review_id {
            Some(review_id) => write!(f, "{}_{}.jpg", review_id, self.ordinal),
            None => write!(f, "_{}.jpg", self.ordinal),
        }
    }
}

/// One analyzed video frame with its visual and text moderation signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEvent {
    pub review_recommended: bool,
    /// Position in the video, in milliseconds
    pub timestamp_ms: i64,
    pub adult_score: Score,
    pub racy_score: Score,
    pub is_adult: bool,
    pub is_racy: bool,
    #[serde(default)]
    pub adult_text_score: Score,
    #[serde(default)]
    pub racy_text_score: Score,
    #[serde(default)]
    pub offensive_text_score: Score,
    #[serde(default)]
    pub is_adult_text: bool,
    #[serde(default)]
    pub is_racy_text: bool,
    #[serde(default)]
    pub is_offensive_text: bool,
    pub frame_name: FrameName,
}

impl FrameEvent {
    /// Create a frame event with default text signals.
    pub fn new(
        ordinal: u32,
        timestamp_ms: i64,
        review_recommended: bool,
        adult_score: Score,
        racy_score: Score,
        is_adult: bool,
        is_racy: bool,
    ) -> Self {
        Self {
            review_recommended,
            timestamp_ms,
            adult_score,
            racy_score,
            is_adult,
            is_racy,
            adult_text_score: Score::zero(),
            racy_text_score: Score::zero(),
            offensive_text_score: Score::zero(),
            is_adult_text: false,
            is_racy_text: false,
            is_offensive_text: false,
            frame_name: FrameName::provisional(ordinal),
        }
    }

    /// Whether the frame lies in the inclusive range `[start_ms, end_ms]`.
    pub fn within(&self, start_ms: i64, end_ms: i64) -> bool {
        self.timestamp_ms >= start_ms && self.timestamp_ms <= end_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_name_rendering() {
        let mut name = FrameName::provisional(7);
        assert_eq!(name.to_string(), "_7.jpg");

        name.bind("201910v2b").unwrap();
        assert_eq!(name.to_string(), "201910v2b_7.jpg");
        assert_eq!(name.review_id(), Some("201910v2b"));
    }

    #[test]
    fn test_frame_name_rejects_second_bind() {
        let mut name = FrameName::provisional(1);
        name.bind("first").unwrap();

        let err = name.bind("second").unwrap_err();
        assert_eq!(
            err,
            FrameNamingError::AlreadyBound {
                ordinal: 1,
                review_id: "first".to_string()
            }
        );
        assert_eq!(name.to_string(), "first_1.jpg");
    }

    #[test]
    fn test_frame_name_rejects_empty_review_id() {
        let mut name = FrameName::provisional(3);
        assert_eq!(name.bind(""), Err(FrameNamingError::EmptyReviewId));
        assert!(!name.is_bound());
    }

    #[test]
    fn test_frame_within_is_inclusive() {
        let frame = FrameEvent::new(1, 1000, false, Score::zero(), Score::zero(), false, false);
        assert!(frame.within(0, 1000));
        assert!(frame.within(1000, 2000));
        assert!(!frame.within(1001, 2000));
    }
}
