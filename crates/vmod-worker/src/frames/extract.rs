//! Frame event extraction from the visual moderation report.

use tracing::debug;

use vmod_models::{FrameEvent, FrameThresholds, VisualReport};

use crate::error::{WorkerError, WorkerResult};

/// Flatten a report into frame events with millisecond timestamps.
///
/// Ordinals are 1-based and follow report order across fragments, event
/// groups and records. Any parse or time-scale problem fails the whole
/// extraction.
pub fn extract_frame_events(
    report_json: &str,
    thresholds: FrameThresholds,
) -> WorkerResult<Vec<FrameEvent>> {
    let report: VisualReport = serde_json::from_str(report_json)
        .map_err(|e| WorkerError::malformed_report(format!("unparseable report: {}", e)))?;

    let timescale = report
        .timescale
        .ticks_per_second()
        .ok_or_else(|| WorkerError::malformed_report("time scale is not an integer"))?;
    if timescale <= 0 {
        return Err(WorkerError::malformed_report(format!(
            "time scale must be positive, got {}",
            timescale
        )));
    }

    let records = report
        .fragments
        .iter()
        .filter_map(|fragment| fragment.events.as_ref())
        .flatten()
        .flatten();

    let mut frames = Vec::new();
    for (index, record) in records.enumerate() {
        let ordinal = u32::try_from(index + 1)
            .map_err(|_| WorkerError::malformed_report("too many frame events"))?;
        let timestamp_ms = record
            .timestamp
            .checked_mul(1000)
            .map(|ticks| ticks / timescale)
            .ok_or_else(|| {
                WorkerError::malformed_report(format!(
                    "timestamp {} overflows at time scale {}",
                    record.timestamp, timescale
                ))
            })?;

        frames.push(FrameEvent::new(
            ordinal,
            timestamp_ms,
            record.review_recommended,
            record.adult_score.clone(),
            record.racy_score.clone(),
            record.adult_score.exceeds(thresholds.adult),
            record.racy_score.exceeds(thresholds.racy),
        ));
    }

    debug!("Extracted {} frame events at time scale {}", frames.len(), timescale);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: FrameThresholds = FrameThresholds {
        adult: 0.5,
        racy: 0.5,
    };

    #[test]
    fn test_two_frame_report() {
        let json = r#"{"timescale": 1000, "fragments": [{"start": 0, "events": [[
            {"reviewRecommended": true, "adultScore": "0.9", "racyScore": "0.2", "timestamp": 0},
            {"reviewRecommended": false, "adultScore": "0.1", "racyScore": "0.6", "timestamp": 2000}
        ]]}]}"#;

        let frames = extract_frame_events(json, THRESHOLDS).unwrap();

        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_adult);
        assert_eq!(frames[0].timestamp_ms, 0);
        assert_eq!(frames[0].adult_score.as_str(), "0.9");
        assert!(frames[0].review_recommended);
        assert!(!frames[1].is_adult);
        assert!(frames[1].is_racy);
        assert_eq!(frames[1].timestamp_ms, 2000);
        assert_eq!(frames[1].adult_text_score.as_str(), "0");
        assert!(!frames[1].is_adult_text);
    }

    #[test]
    fn test_ordinals_dense_across_nesting() {
        let json = r#"{"timeScale": "90000", "fragments": [
            {"start": 0},
            {"events": [
                [{"adultScore": 0.1, "racyScore": 0.1, "timestamp": 90000}],
                [],
                [{"adultScore": 0.1, "racyScore": 0.1, "timestamp": 180000},
                 {"adultScore": 0.1, "racyScore": 0.1, "timestamp": 270000}]
            ]},
            {"events": [[{"adultScore": 0.1, "racyScore": 0.1, "timestamp": 45000}]]}
        ]}"#;

        let frames = extract_frame_events(json, THRESHOLDS).unwrap();

        let names: Vec<String> = frames.iter().map(|f| f.frame_name.to_string()).collect();
        assert_eq!(names, vec!["_1.jpg", "_2.jpg", "_3.jpg", "_4.jpg"]);
        let ordinals: Vec<u32> = frames.iter().map(|f| f.frame_name.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4]);
        assert_eq!(frames[0].timestamp_ms, 1000);
        assert_eq!(frames[3].timestamp_ms, 500);
    }

    #[test]
    fn test_timestamp_normalization_truncates() {
        let json = r#"{"timescale": 3, "fragments": [{"events": [[
            {"adultScore": "0", "racyScore": "0", "timestamp": 7}
        ]]}]}"#;
        let frames = extract_frame_events(json, THRESHOLDS).unwrap();
        assert_eq!(frames[0].timestamp_ms, 7 * 1000 / 3);
    }

    #[test]
    fn test_zero_timescale_is_malformed() {
        let json = r#"{"timescale": 0, "fragments": []}"#;
        let err = extract_frame_events(json, THRESHOLDS).unwrap_err();
        assert!(matches!(err, WorkerError::MalformedReport(_)));
    }

    #[test]
    fn test_non_numeric_timescale_is_malformed() {
        let json = r#"{"timescale": "fast", "fragments": []}"#;
        assert!(matches!(
            extract_frame_events(json, THRESHOLDS),
            Err(WorkerError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_unparseable_report_is_malformed() {
        assert!(matches!(
            extract_frame_events("not json", THRESHOLDS),
            Err(WorkerError::MalformedReport(_))
        ));
        let bad_score = r#"{"timescale": 1000, "fragments": [{"events": [[
            {"adultScore": "high", "racyScore": "0", "timestamp": 0}
        ]]}]}"#;
        assert!(matches!(
            extract_frame_events(bad_score, THRESHOLDS),
            Err(WorkerError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_overflowing_timestamp_is_malformed() {
        let json = format!(
            r#"{{"timescale": 1000, "fragments": [{{"events": [[
                {{"adultScore": "0", "racyScore": "0", "timestamp": {}}}
            ]]}}]}}"#,
            i64::MAX
        );
        assert!(matches!(
            extract_frame_events(&json, THRESHOLDS),
            Err(WorkerError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_report_without_events() {
        let json = r#"{"timescale": 1000, "fragments": [{"start": 0, "duration": 10}]}"#;
        assert!(extract_frame_events(json, THRESHOLDS).unwrap().is_empty());
    }
}
