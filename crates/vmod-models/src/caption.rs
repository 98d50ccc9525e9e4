//! Caption and text screening models.

use serde::{Deserialize, Serialize};

/// Category probabilities from text screening.
///
/// Category 1 maps to adult text, category 2 to racy text and category 3 to
/// offensive text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextClassification {
    pub category1_score: f64,
    pub category2_score: f64,
    pub category3_score: f64,
}

/// A flagged term occurrence in a caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModeratedTerm {
    pub index: i64,
    pub term: String,
}

/// One caption cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSegment {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: Vec<String>,
    /// Absent until screened, or when screening failed for this cue
    #[serde(default)]
    pub classification: Option<TextClassification>,
    #[serde(default)]
    pub terms: Vec<ModeratedTerm>,
}

impl CaptionSegment {
    pub fn new(start_ms: i64, end_ms: i64, text: Vec<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text,
            classification: None,
            terms: Vec::new(),
        }
    }

    /// Caption lines joined into the text submitted for screening.
    pub fn screening_text(&self) -> String {
        self.text.join(" ")
    }
}

/// Caption source text and its screened cues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptBundle {
    /// The caption file exactly as downloaded
    pub source: String,
    pub captions: Vec<CaptionSegment>,
}

impl TranscriptBundle {
    /// Whether any cue carries a classification.
    pub fn has_classifications(&self) -> bool {
        self.captions.iter().any(|c| c.classification.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screening_text_joins_lines() {
        let caption = CaptionSegment::new(0, 10, vec!["hello".into(), "world".into()]);
        assert_eq!(caption.screening_text(), "hello world");
    }

    #[test]
    fn test_has_classifications() {
        let mut bundle = TranscriptBundle {
            source: "WEBVTT".into(),
            captions: vec![CaptionSegment::new(0, 10, vec!["a".into()])],
        };
        assert!(!bundle.has_classifications());

        bundle.captions[0].classification = Some(TextClassification {
            category1_score: 0.1,
            category2_score: 0.2,
            category3_score: 0.3,
        });
        assert!(bundle.has_classifications());
    }
}
