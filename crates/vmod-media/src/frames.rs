//! Frame image generation for review batches.
//!
//! Frames are grabbed from the video with multi-input FFmpeg invocations,
//! written to one directory per batch and zipped into one archive per batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use vmod_models::FrameEvent;

use crate::archive::archive_directory;
use crate::command::{FfmpegRunner, FrameGrabCommand};
use crate::error::{MediaError, MediaResult};

/// Concurrent FFmpeg invocations when grabbing frames.
pub const DEFAULT_MAX_FFMPEG_PROCESSES: usize = 4;
/// Width of review frame images.
pub const FRAME_SCALE_WIDTH: u32 = 320;
/// Upper bound on the argument text of one FFmpeg invocation.
pub const MAX_COMMAND_CHARS: usize = 30_000;

/// One frame to grab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGrab {
    /// Position in the video, in milliseconds
    pub position_ms: i64,
    /// Image file name inside the batch archive
    pub file_name: String,
}

impl From<&FrameEvent> for FrameGrab {
    fn from(frame: &FrameEvent) -> Self {
        Self {
            position_ms: frame.timestamp_ms,
            file_name: frame.frame_name.to_string(),
        }
    }
}

/// Generates per-batch frame archives with bounded FFmpeg parallelism.
#[derive(Debug, Clone)]
pub struct FrameArchiver {
    runner: FfmpegRunner,
    max_parallel: usize,
}

impl FrameArchiver {
    pub fn new(runner: FfmpegRunner, max_parallel: usize) -> Self {
        Self {
            runner,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Grab every frame of every batch and zip each batch.
    ///
    /// Images land in `{work_dir}/{review_id}/{batch}/` and archives in
    /// `{work_dir}/{review_id}_zip/{batch}.zip`. The returned archive paths
    /// are in batch order.
    pub async fn generate(
        &self,
        video: &Path,
        batches: &[Vec<FrameGrab>],
        work_dir: &Path,
        review_id: &str,
    ) -> MediaResult<Vec<PathBuf>> {
        if !video.exists() {
            return Err(MediaError::FileNotFound(video.to_path_buf()));
        }

        let frames_root = work_dir.join(review_id);
        let zip_root = work_dir.join(format!("{}_zip", review_id));
        for index in 0..batches.len() {
            tokio::fs::create_dir_all(frames_root.join(index.to_string())).await?;
        }
        tokio::fs::create_dir_all(&zip_root).await?;

        let commands = plan_commands(video, batches, &frames_root, MAX_COMMAND_CHARS);
        let total_frames: usize = batches.iter().map(Vec::len).sum();
        info!(
            "Grabbing {} frames with {} FFmpeg invocations (max {} concurrent)",
            total_frames,
            commands.len(),
            self.max_parallel
        );

        self.run_commands(commands).await?;
        info!("{} frame images were created", total_frames);

        let mut archives = Vec::with_capacity(batches.len());
        for index in 0..batches.len() {
            let dir = frames_root.join(index.to_string());
            let archive = zip_root.join(format!("{}.zip", index));
            let path = tokio::task::spawn_blocking(move || archive_directory(&dir, &archive))
                .await
                .map_err(|e| MediaError::internal(format!("archive task failed: {}", e)))??;
            archives.push(path);
        }

        info!("{} frame archives were created", archives.len());
        Ok(archives)
    }

    async fn run_commands(&self, commands: Vec<FrameGrabCommand>) -> MediaResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let futures: Vec<_> = commands
            .iter()
            .enumerate()
            .map(|(idx, cmd)| {
                let semaphore = Arc::clone(&semaphore);
                let runner = &self.runner;
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| MediaError::internal("FFmpeg semaphore closed"))?;
                    debug!("Frame grab invocation {} ({} frames) started", idx, cmd.len());
                    runner.run_grabs(cmd).await?;
                    debug!("Frame grab invocation {} done", idx);
                    Ok::<(), MediaError>(())
                }
            })
            .collect();

        // Every invocation runs to completion; the first failure is reported
        join_all(futures).await.into_iter().collect()
    }
}

/// Pack all grabs, in batch order, into invocations below `max_chars`.
fn plan_commands(
    video: &Path,
    batches: &[Vec<FrameGrab>],
    frames_root: &Path,
    max_chars: usize,
) -> Vec<FrameGrabCommand> {
    let mut commands = Vec::new();
    let mut current = FrameGrabCommand::new(video, FRAME_SCALE_WIDTH);
    let base_len = current.text_len();
    let mut current_len = base_len;

    for (index, batch) in batches.iter().enumerate() {
        let batch_dir = frames_root.join(index.to_string());
        for grab in batch {
            let output = batch_dir.join(&grab.file_name);
            let added = current.grab_text_len(grab.position_ms, &output);
            if !current.is_empty() && current_len + added > max_chars {
                commands.push(std::mem::replace(
                    &mut current,
                    FrameGrabCommand::new(video, FRAME_SCALE_WIDTH),
                ));
                current_len = base_len;
            }
            current_len += current.grab_text_len(grab.position_ms, &output);
            current.push(grab.position_ms, &output);
        }
    }

    if !current.is_empty() {
        commands.push(current);
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmod_models::Score;

    fn grabs(count: usize) -> Vec<FrameGrab> {
        (1..=count)
            .map(|i| FrameGrab {
                position_ms: i as i64 * 1000,
                file_name: format!("rev_{}.jpg", i),
            })
            .collect()
    }

    #[test]
    fn test_frame_grab_from_event_uses_bound_name() {
        let mut frame = FrameEvent::new(3, 4000, false, Score::zero(), Score::zero(), false, false);
        frame.frame_name.bind("rev").unwrap();

        let grab = FrameGrab::from(&frame);
        assert_eq!(grab.position_ms, 4000);
        assert_eq!(grab.file_name, "rev_3.jpg");
    }

    #[test]
    fn test_plan_commands_single_invocation_when_small() {
        let batches = vec![grabs(3), grabs(2)];
        let commands = plan_commands(Path::new("v.mp4"), &batches, Path::new("/w/rev"), MAX_COMMAND_CHARS);

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].len(), 5);
        let joined = commands[0].build_args().join(" ");
        assert!(joined.contains("/w/rev/0/rev_1.jpg"));
        assert!(joined.contains("/w/rev/1/rev_2.jpg"));
    }

    #[test]
    fn test_plan_commands_respects_char_budget() {
        let batches = vec![grabs(200)];
        let commands = plan_commands(Path::new("v.mp4"), &batches, Path::new("/w/rev"), 2_000);

        assert!(commands.len() > 1);
        assert!(commands.iter().all(|c| c.text_len() <= 2_000));
        let total: usize = commands.iter().map(FrameGrabCommand::len).sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn test_plan_commands_no_batches() {
        let commands = plan_commands(Path::new("v.mp4"), &[], Path::new("/w/rev"), MAX_COMMAND_CHARS);
        assert!(commands.is_empty());
    }

    #[tokio::test]
    async fn test_generate_requires_video() {
        let dir = tempfile::TempDir::new().unwrap();
        let archiver = FrameArchiver::new(FfmpegRunner::with_binary("ffmpeg"), 4);
        let err = archiver
            .generate(&dir.path().join("none.mp4"), &[grabs(1)], dir.path(), "rev")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
