//! Video moderation worker.
//!
//! This crate provides:
//! - Frame event extraction from the visual moderation report
//! - Text score merging, batching and frame naming
//! - The review upload state machine
//! - The per-video pipeline, its configuration and video discovery

pub mod config;
pub mod discover;
pub mod error;
pub mod frames;
pub mod logging;
pub mod pipeline;
pub mod summary;
pub mod uploader;

pub use config::{AppConfig, ConfigError, WorkerConfig};
pub use discover::discover_videos;
pub use error::{WorkerError, WorkerResult};
pub use frames::{extract_frame_events, merge_text_scores, partition, rebind_names};
pub use logging::VideoLogger;
pub use pipeline::VideoPipeline;
pub use summary::VideoReviewSummary;
pub use uploader::{FrameImageGenerator, ReviewUpload, ReviewUploader};
