//! Score thresholds.

use serde::{Deserialize, Serialize};

/// Visual score thresholds. A frame is flagged when its score is strictly above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameThresholds {
    pub adult: f64,
    pub racy: f64,
}

/// Text category thresholds (category 1 adult, 2 racy, 3 offensive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextThresholds {
    pub category1: f64,
    pub category2: f64,
    pub category3: f64,
}
