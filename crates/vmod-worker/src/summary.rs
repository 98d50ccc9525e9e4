//! Review-level summary of a video's frame events.

use vmod_models::{FrameEvent, FrameThresholds, MetadataPair, Score, TextThresholds};

/// Highest text category scores across all frames.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSummary {
    pub category1_score: Score,
    pub is_adult_text: bool,
    pub category2_score: Score,
    pub is_racy_text: bool,
    pub category3_score: Score,
    pub is_offensive_text: bool,
}

/// Aggregate metadata seeding review creation.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoReviewSummary {
    pub review_recommended: bool,
    pub adult_score: Score,
    pub is_adult: bool,
    pub racy_score: Score,
    pub is_racy: bool,
    /// Present when text moderation ran for the video
    pub text: Option<TextSummary>,
}

/// The highest score, keeping the earliest frame on ties.
fn max_score<'a>(frames: &'a [FrameEvent], score: impl Fn(&'a FrameEvent) -> &'a Score) -> Score {
    let mut best: Option<&Score> = None;
    for frame in frames {
        let candidate = score(frame);
        if best.map_or(true, |b| candidate.value() > b.value()) {
            best = Some(candidate);
        }
    }
    best.cloned().unwrap_or_default()
}

impl VideoReviewSummary {
    /// Summarize the full merged frame sequence. No frames, no summary.
    pub fn compute(
        frames: &[FrameEvent],
        frame_thresholds: FrameThresholds,
        text_thresholds: Option<TextThresholds>,
    ) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }

        let adult_score = max_score(frames, |f| &f.adult_score);
        let racy_score = max_score(frames, |f| &f.racy_score);

        let text = text_thresholds.map(|thresholds| {
            let category1_score = max_score(frames, |f| &f.adult_text_score);
            let category2_score = max_score(frames, |f| &f.racy_text_score);
            let category3_score = max_score(frames, |f| &f.offensive_text_score);
            TextSummary {
                is_adult_text: category1_score.exceeds(thresholds.category1),
                is_racy_text: category2_score.exceeds(thresholds.category2),
                is_offensive_text: category3_score.exceeds(thresholds.category3),
                category1_score,
                category2_score,
                category3_score,
            }
        });

        Some(Self {
            review_recommended: frames.iter().any(|f| f.review_recommended),
            is_adult: adult_score.exceeds(frame_thresholds.adult),
            is_racy: racy_score.exceeds(frame_thresholds.racy),
            adult_score,
            racy_score,
            text,
        })
    }

    /// Review creation metadata pairs.
    pub fn metadata(&self) -> Vec<MetadataPair> {
        let mut metadata = vec![
            MetadataPair::flag("ReviewRecommended", self.review_recommended),
            MetadataPair::new("AdultScore", self.adult_score.as_str()),
            MetadataPair::flag("a", self.is_adult),
            MetadataPair::new("RacyScore", self.racy_score.as_str()),
            MetadataPair::flag("r", self.is_racy),
        ];
        if let Some(text) = &self.text {
            metadata.extend([
                MetadataPair::new("Category1TextScore", text.category1_score.as_str()),
                MetadataPair::flag("at", text.is_adult_text),
                MetadataPair::new("Category2TextScore", text.category2_score.as_str()),
                MetadataPair::flag("rt", text.is_racy_text),
                MetadataPair::new("Category3TextScore", text.category3_score.as_str()),
                MetadataPair::flag("ot", text.is_offensive_text),
            ]);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameThresholds = FrameThresholds {
        adult: 0.5,
        racy: 0.5,
    };
    const TEXT: TextThresholds = TextThresholds {
        category1: 0.5,
        category2: 0.5,
        category3: 0.5,
    };

    fn frame(ordinal: u32, adult: &str, racy: &str, recommended: bool) -> FrameEvent {
        FrameEvent::new(
            ordinal,
            ordinal as i64 * 1000,
            recommended,
            adult.parse().unwrap(),
            racy.parse().unwrap(),
            false,
            false,
        )
    }

    fn keys(metadata: &[MetadataPair]) -> Vec<&str> {
        metadata.iter().map(|m| m.key.as_str()).collect()
    }

    #[test]
    fn test_summary_takes_max_scores() {
        let frames = vec![
            frame(1, "0.2", "0.7", false),
            frame(2, "0.9", "0.1", true),
            frame(3, "0.4", "0.3", false),
        ];
        let summary = VideoReviewSummary::compute(&frames, FRAME, None).unwrap();

        assert_eq!(summary.adult_score.as_str(), "0.9");
        assert!(summary.is_adult);
        assert_eq!(summary.racy_score.as_str(), "0.7");
        assert!(summary.is_racy);
        assert!(summary.review_recommended);
        assert_eq!(keys(&summary.metadata()), vec!["ReviewRecommended", "AdultScore", "a", "RacyScore", "r"]);
        assert_eq!(summary.metadata()[0].value, "True");
    }

    #[test]
    fn test_summary_tie_keeps_lowest_ordinal_text() {
        let frames = vec![frame(1, "0.50", "0", false), frame(2, "0.5", "0", false)];
        let summary = VideoReviewSummary::compute(&frames, FRAME, None).unwrap();
        assert_eq!(summary.adult_score.as_str(), "0.50");
        assert!(!summary.is_adult);
    }

    #[test]
    fn test_summary_text_keys_when_transcript_present() {
        let mut frames = vec![frame(1, "0.1", "0.1", false)];
        frames[0].adult_text_score = Score::from_value(0.8);
        frames[0].is_adult_text = true;

        let summary = VideoReviewSummary::compute(&frames, FRAME, Some(TEXT)).unwrap();
        let metadata = summary.metadata();

        assert_eq!(
            keys(&metadata),
            vec![
                "ReviewRecommended", "AdultScore", "a", "RacyScore", "r",
                "Category1TextScore", "at", "Category2TextScore", "rt", "Category3TextScore", "ot"
            ]
        );
        assert_eq!(metadata[5].value, "0.8");
        assert_eq!(metadata[6].value, "True");
        assert_eq!(metadata[8].value, "False");
        assert_eq!(metadata[9].value, "0");
    }

    #[test]
    fn test_no_frames_no_summary() {
        assert!(VideoReviewSummary::compute(&[], FRAME, Some(TEXT)).is_none());
    }
}
