//! Clients for the moderation services.
//!
//! This crate provides:
//! - Visual moderation jobs on a cloud media service (submit, poll, fetch report)
//! - Text screening of caption cues
//! - WebVTT caption download and parsing

pub mod arm;
pub mod captions;
pub mod error;
pub mod sleeper;
pub mod text;
pub mod visual;

pub use arm::{ArmMediaClient, VisualModeratorConfig};
pub use captions::{fetch_captions, parse_webvtt};
pub use error::{ModerationError, ModerationResult};
pub use sleeper::{Sleeper, TokioSleeper};
pub use text::{TextModerator, TextModeratorConfig};
pub use visual::{
    JobState, JobStatus, LocatorPolicy, MediaJobApi, ModerationJobNames, VisualModerator,
    DEFAULT_POLL_INTERVAL, REPORT_FILE_NAME,
};
