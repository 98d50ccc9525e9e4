//! Review tool settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

use vmod_models::{FrameThresholds, TextThresholds};

/// Review tool endpoint, team and moderation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewToolConfig {
    #[validate(url)]
    pub api_endpoint: String,
    #[validate(length(min = 1))]
    pub api_subscription_key: String,
    #[validate(length(min = 1))]
    pub team_id: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub adult_frame_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub racy_frame_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub category1_text_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub category2_text_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub category3_text_threshold: f64,
}

impl ReviewToolConfig {
    pub fn frame_thresholds(&self) -> FrameThresholds {
        FrameThresholds {
            adult: self.adult_frame_threshold,
            racy: self.racy_frame_threshold,
        }
    }

    pub fn text_thresholds(&self) -> TextThresholds {
        TextThresholds {
            category1: self.category1_text_threshold,
            category2: self.category2_text_threshold,
            category3: self.category3_text_threshold,
        }
    }

    /// Base URL of the team's reviews collection.
    pub fn reviews_url(&self) -> String {
        format!(
            "{}/contentmoderator/review/v1.0/teams/{}/reviews",
            self.api_endpoint.trim_end_matches('/'),
            self.team_id
        )
    }
}
