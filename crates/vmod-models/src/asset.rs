//! Visual moderation job outputs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Published URLs of a moderated asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingUrls {
    pub smooth: Option<String>,
    pub dash: Option<String>,
    pub hls: Option<String>,
    /// Download URL of the generated `transcript.vtt`
    pub vtt: Option<String>,
}

/// Result of a finished visual moderation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualModerationAsset {
    /// Raw `contentmoderation.json` text
    pub report_json: String,
    /// Name of the encoded output asset, used as the review content id
    pub video_name: String,
    /// Local path of the video that was moderated
    pub video_path: PathBuf,
    pub streaming: StreamingUrls,
}

impl VisualModerationAsset {
    /// Locator the review tool streams the video from, if one was published.
    pub fn content_locator(&self) -> Option<&str> {
        self.streaming.smooth.as_deref().filter(|url| !url.is_empty())
    }
}
