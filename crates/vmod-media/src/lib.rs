//! FFmpeg CLI wrapper for the moderation pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Proxy video compression
//! - Frame image grabbing with bounded parallelism
//! - Per-batch frame archives
//! - Scoped work directories with best-effort cleanup

pub mod archive;
pub mod command;
pub mod compress;
pub mod error;
pub mod frames;
pub mod progress;
pub mod workspace;

pub use archive::archive_directory;
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, FrameGrabCommand};
pub use compress::{compress_video, proxy_file_name};
pub use error::{MediaError, MediaResult};
pub use frames::{FrameArchiver, FrameGrab, DEFAULT_MAX_FFMPEG_PROCESSES};
pub use progress::FfmpegProgress;
pub use workspace::ScopedWorkspace;
