//! Overlay of caption text scores onto frame events.

use vmod_models::{CaptionSegment, FrameEvent, Score, TextThresholds};

/// Merge every classified caption into the frames its time range covers.
///
/// A covered frame keeps the highest score seen per category and its text
/// flags only ever turn on. Merging the same captions again changes nothing.
pub fn merge_text_scores(
    mut frames: Vec<FrameEvent>,
    captions: &[CaptionSegment],
    thresholds: TextThresholds,
) -> Vec<FrameEvent> {
    for caption in captions {
        let Some(classification) = caption.classification else {
            continue;
        };

        for frame in frames
            .iter_mut()
            .filter(|f| f.within(caption.start_ms, caption.end_ms))
        {
            raise(&mut frame.adult_text_score, classification.category1_score);
            raise(&mut frame.racy_text_score, classification.category2_score);
            raise(&mut frame.offensive_text_score, classification.category3_score);

            frame.is_adult_text |= classification.category1_score > thresholds.category1;
            frame.is_racy_text |= classification.category2_score > thresholds.category2;
            frame.is_offensive_text |= classification.category3_score > thresholds.category3;
        }
    }
    frames
}

fn raise(score: &mut Score, candidate: f64) {
    if candidate > score.value() {
        *score = Score::from_value(candidate);
    }
}
