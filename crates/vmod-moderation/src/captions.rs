//! WebVTT caption download and parsing.

use reqwest::Client;
use tracing::debug;

use vmod_models::CaptionSegment;

use crate::error::{ModerationError, ModerationResult};

/// Download a caption file as text.
pub async fn fetch_captions(http: &Client, url: &str) -> ModerationResult<String> {
    debug!("Downloading captions from {}", url);
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ModerationError::from_response(response).await);
    }
    Ok(response.text().await?)
}

/// Parse WebVTT text into caption cues.
///
/// The header, `NOTE`/`STYLE`/`REGION` blocks and cue identifiers are
/// skipped. Cue settings after the end timestamp are ignored.
pub fn parse_webvtt(text: &str) -> ModerationResult<Vec<CaptionSegment>> {
    let text = text.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut blocks = text.split("\n\n").map(str::trim).filter(|b| !b.is_empty());

    let header = blocks
        .next()
        .ok_or_else(|| ModerationError::CaptionParse("empty caption file".into()))?;
    if !header.starts_with("WEBVTT") {
        return Err(ModerationError::CaptionParse(
            "missing WEBVTT header".into(),
        ));
    }

    let mut captions = Vec::new();
    for block in blocks {
        if ["NOTE", "STYLE", "REGION"]
            .iter()
            .any(|kind| block.starts_with(kind))
        {
            continue;
        }

        let mut lines = block.lines();
        let timing = loop {
            match lines.next() {
                Some(line) if line.contains("-->") => break line,
                // Cue identifier
                Some(_) => continue,
                None => {
                    return Err(ModerationError::CaptionParse(format!(
                        "cue without timing: {}",
                        block
                    )))
                }
            }
        };

        let (start_ms, end_ms) = parse_timing(timing)?;
        let text: Vec<String> = lines
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        captions.push(CaptionSegment::new(start_ms, end_ms, text));
    }

    Ok(captions)
}

fn parse_timing(line: &str) -> ModerationResult<(i64, i64)> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| ModerationError::CaptionParse(format!("bad timing line: {}", line)))?;
    let end = rest.split_whitespace().next().unwrap_or_default();
    Ok((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm` to milliseconds.
fn parse_timestamp(value: &str) -> ModerationResult<i64> {
    let bad = || ModerationError::CaptionParse(format!("bad timestamp: {}", value));

    let (clock, millis) = value.split_once('.').ok_or_else(bad)?;
    if millis.len() != 3 {
        return Err(bad());
    }
    let millis: i64 = millis.parse().map_err(|_| bad())?;

    let parts: Vec<i64> = clock
        .split(':')
        .map(|p| p.parse::<i64>().map_err(|_| bad()))
        .collect::<ModerationResult<_>>()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(bad()),
    };
    if minutes >= 60 || seconds >= 60 {
        return Err(bad());
    }

    hours
        .checked_mul(60)
        .and_then(|v| v.checked_add(minutes))
        .and_then(|v| v.checked_mul(60))
        .and_then(|v| v.checked_add(seconds))
        .and_then(|v| v.checked_mul(1000))
        .and_then(|v| v.checked_add(millis))
        .ok_or_else(bad)
}
