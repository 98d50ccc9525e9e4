//! FFmpeg command builders and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for single input, single output FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments between the input and the output
    output_args: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Constant rate factor; higher is smaller and blurrier.
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Overwriting, error-level logging, progress on stderr, then
    /// `-i input`, the output arguments and the output path.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Builder for one FFmpeg invocation grabbing several still frames.
///
/// Every grab opens the video as its own seeked input and maps that input's
/// video stream to a single-frame output:
/// `-ss T -i video -map K:v -frames:v 1 -vf scale=W:-1 out.jpg`.
#[derive(Debug, Clone)]
pub struct FrameGrabCommand {
    video: PathBuf,
    scale_width: u32,
    grabs: Vec<(i64, PathBuf)>,
}

impl FrameGrabCommand {
    pub fn new(video: impl AsRef<Path>, scale_width: u32) -> Self {
        Self {
            video: video.as_ref().to_path_buf(),
            scale_width,
            grabs: Vec::new(),
        }
    }

    /// Add a grab of the frame at `position_ms` into `output`.
    pub fn push(&mut self, position_ms: i64, output: impl AsRef<Path>) {
        self.grabs.push((position_ms, output.as_ref().to_path_buf()));
    }

    pub fn len(&self) -> usize {
        self.grabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grabs.is_empty()
    }

    /// Arguments contributed by a single grab at input index `input_index`.
    fn grab_args(&self, input_index: usize, position_ms: i64, output: &Path) -> [String; 11] {
        [
            "-ss".to_string(),
            format!("{:.3}", position_ms.max(0) as f64 / 1000.0),
            "-i".to_string(),
            self.video.to_string_lossy().to_string(),
            "-map".to_string(),
            format!("{}:v", input_index),
            "-frames:v".to_string(),
            "1".to_string(),
            "-vf".to_string(),
            format!("scale={}:-1", self.scale_width),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Length of the argument text one more grab would add.
    pub fn grab_text_len(&self, position_ms: i64, output: &Path) -> usize {
        self.grab_args(self.grabs.len(), position_ms, output)
            .iter()
            .map(|a| a.len() + 1)
            .sum()
    }

    /// Length of the full argument text.
    pub fn text_len(&self) -> usize {
        self.build_args().iter().map(|a| a.len() + 1).sum()
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-hide_banner".to_string(),
        ];
        for (index, (position_ms, output)) in self.grabs.iter().enumerate() {
            args.extend(self.grab_args(index, *position_ms, output));
        }
        args
    }
}

/// Runner for FFmpeg commands with progress tracking.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
}

impl FfmpegRunner {
    /// Create a runner for the `ffmpeg` found on PATH.
    pub fn new() -> MediaResult<Self> {
        Ok(Self {
            binary: check_ffmpeg()?,
        })
    }

    /// Create a runner for an explicit FFmpeg binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        self.run_args(cmd.build_args(), progress_callback).await
    }

    /// Run a frame grab command.
    pub async fn run_grabs(&self, cmd: &FrameGrabCommand) -> MediaResult<()> {
        self.run_args(cmd.build_args(), |_| {}).await
    }

    async fn run_args<F>(&self, args: Vec<String>, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        debug!(
            "Running FFmpeg: {} {}",
            self.binary.display(),
            args.join(" ")
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress and diagnostics share stderr
        let stderr_handle = tokio::spawn(async move {
            let mut current_progress = FfmpegProgress::default();
            let mut tail: Vec<String> = Vec::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current_progress) {
                        progress_callback(progress);
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail
        });

        let status = child.wait().await?;
        let tail = stderr_handle.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!tail.is_empty()).then(|| tail.join("\n")),
                status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .video_codec("libx264")
            .crf(32)
            .preset("veryfast");

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert_eq!(args[3..5], ["-progress".to_string(), "pipe:2".to_string()]);
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"32".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_frame_grab_maps_each_input() {
        let mut cmd = FrameGrabCommand::new("video.mp4", 320);
        cmd.push(0, "/w/0/_1.jpg");
        cmd.push(2500, "/w/0/_2.jpg");

        let args = cmd.build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-ss 0.000 -i video.mp4 -map 0:v -frames:v 1 -vf scale=320:-1 /w/0/_1.jpg"));
        assert!(joined.contains("-ss 2.500 -i video.mp4 -map 1:v -frames:v 1 -vf scale=320:-1 /w/0/_2.jpg"));
        assert_eq!(cmd.len(), 2);
    }

    #[test]
    fn test_frame_grab_text_len_accounts_for_growth() {
        let mut cmd = FrameGrabCommand::new("video.mp4", 320);
        cmd.push(0, "/w/_1.jpg");
        let before = cmd.text_len();
        let added = cmd.grab_text_len(1000, Path::new("/w/_2.jpg"));
        cmd.push(1000, "/w/_2.jpg");
        assert_eq!(before + added, cmd.text_len());
    }
}
