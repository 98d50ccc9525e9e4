//! Raw visual moderation report (`contentmoderation.json`).
//!
//! Only the fields consumed by frame extraction are modelled.

use serde::{Deserialize, Serialize};

use crate::score::Score;

/// Time scale as found in the report; providers emit it as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimeScale {
    Number(i64),
    Text(String),
}

impl RawTimeScale {
    /// Ticks per second, if the value is an integer.
    pub fn ticks_per_second(&self) -> Option<i64> {
        match self {
            RawTimeScale::Number(n) => Some(*n),
            RawTimeScale::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Top-level visual moderation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualReport {
    #[serde(alias = "timeScale")]
    pub timescale: RawTimeScale,
    pub fragments: Vec<ReportFragment>,
}

/// A report fragment holding zero or more event groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFragment {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub events: Option<Vec<Vec<RawFrameRecord>>>,
}

/// One raw analyzed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrameRecord {
    #[serde(default)]
    pub review_recommended: bool,
    pub adult_score: Score,
    pub racy_score: Score,
    #[serde(default)]
    pub index: Option<i64>,
    /// Timestamp in report time-scale ticks
    #[serde(alias = "timeStamp")]
    pub timestamp: i64,
    #[serde(default)]
    pub shot_index: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_report() {
        let json = r#"{
            "version": 2,
            "timescale": 90000,
            "offset": 0,
            "framerate": 50,
            "fragments": [
                {"start": 0, "duration": 18000},
                {"start": 18000, "duration": 3600, "interval": 3600, "events": [[
                    {"reviewRecommended": false, "adultScore": 0.00001, "racyScore": 0.03077,
                     "index": 5, "timestamp": 18000, "shotIndex": 0}
                ]]}
            ]
        }"#;

        let report: VisualReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.timescale.ticks_per_second(), Some(90000));
        assert!(report.fragments[0].events.is_none());

        let events = report.fragments[1].events.as_ref().unwrap();
        assert_eq!(events[0][0].timestamp, 18000);
        assert_eq!(events[0][0].racy_score.as_str(), "0.03077");
    }

    #[test]
    fn test_time_scale_as_text() {
        assert_eq!(
            RawTimeScale::Text("1000".into()).ticks_per_second(),
            Some(1000)
        );
        assert_eq!(RawTimeScale::Text("fast".into()).ticks_per_second(), None);
    }
}
