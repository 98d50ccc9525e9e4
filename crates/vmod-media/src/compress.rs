//! Proxy video compression.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Width of the proxy video sent to moderation.
pub const PROXY_SCALE_WIDTH: u32 = 640;
/// Quality of the proxy encode; moderation does not need fidelity.
pub const PROXY_CRF: u8 = 32;
pub const PROXY_PRESET: &str = "veryfast";

/// File name of the proxy for `input`: `{stem}_c.mp4`.
pub fn proxy_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_c.mp4", stem)
}

fn proxy_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_codec("libx264")
        .crf(PROXY_CRF)
        .preset(PROXY_PRESET)
        .video_filter(format!("scale={}:-1", PROXY_SCALE_WIDTH))
        .audio_codec("aac")
        .output_args(["-aq", "1", "-ac", "2", "-threads", "0"])
}

/// Compress `input` into a low-resolution proxy inside `output_dir`.
///
/// Returns the proxy path.
pub async fn compress_video(
    runner: &FfmpegRunner,
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    tokio::fs::create_dir_all(output_dir.as_ref()).await?;
    let output = output_dir.as_ref().join(proxy_file_name(input));

    info!("Compressing {} -> {}", input.display(), output.display());

    let cmd = proxy_command(input, &output);
    runner
        .run_with_progress(&cmd, |progress| {
            debug!(
                out_time = %progress.out_time,
                speed = progress.speed,
                "Proxy compression progress"
            );
        })
        .await?;

    info!("Proxy video ready: {}", output.display());
    Ok(output)
}
