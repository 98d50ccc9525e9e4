//! Per-video pipeline.
//!
//! compress -> visual moderation -> extract -> text moderation -> merge ->
//! review upload, inside a scoped work directory that is removed on every
//! exit path.

use std::path::{Path, PathBuf};
use std::time::Instant;

use reqwest::Client;
use tracing::Instrument;

use vmod_media::{compress_video, FfmpegRunner, FrameArchiver, MediaError, ScopedWorkspace};
use vmod_models::{
    FrameEvent, FrameThresholds, TextThresholds, TranscriptBundle, VisualModerationAsset,
};
use vmod_moderation::{
    fetch_captions, parse_webvtt, ArmMediaClient, MediaJobApi, TextModerator, TokioSleeper,
    VisualModerator,
};
use vmod_review::{ReviewApi, ReviewClient};

use crate::config::AppConfig;
use crate::error::WorkerResult;
use crate::frames::{extract_frame_events, merge_text_scores};
use crate::logging::VideoLogger;
use crate::uploader::{FrameImageGenerator, ReviewUpload, ReviewUploader};

/// Processes videos one at a time into published reviews.
pub struct VideoPipeline<A = ArmMediaClient, R = ReviewClient, G = FrameArchiver> {
    runner: FfmpegRunner,
    visual: VisualModerator<A, TokioSleeper>,
    text: TextModerator,
    http: Client,
    uploader: ReviewUploader<R, G>,
    frame_thresholds: FrameThresholds,
    text_thresholds: TextThresholds,
    work_dir: PathBuf,
}

impl VideoPipeline {
    /// Build the pipeline from validated configuration.
    pub fn from_config(config: &AppConfig) -> WorkerResult<Self> {
        let runner = FfmpegRunner::new()?;

        let visual = VisualModerator::new(
            ArmMediaClient::new(config.visual_moderator.clone())?,
            TokioSleeper,
            config.visual_moderator.poll_interval(),
        );
        let text = TextModerator::new(config.text_moderator.clone())?;

        let frame_thresholds = config.review_tool.frame_thresholds();
        let text_thresholds = config.review_tool.text_thresholds();
        let uploader = ReviewUploader::new(
            ReviewClient::new(&config.review_tool)?,
            FrameArchiver::new(runner.clone(), config.worker.max_ffmpeg_processes),
            frame_thresholds,
            text_thresholds,
            config.worker.batch_size(),
        );

        Ok(Self::new(
            runner,
            visual,
            text,
            uploader,
            frame_thresholds,
            text_thresholds,
            config.worker.work_dir.clone(),
        ))
    }
}

impl<A: MediaJobApi, R: ReviewApi, G: FrameImageGenerator> VideoPipeline<A, R, G> {
    pub fn new(
        runner: FfmpegRunner,
        visual: VisualModerator<A, TokioSleeper>,
        text: TextModerator,
        uploader: ReviewUploader<R, G>,
        frame_thresholds: FrameThresholds,
        text_thresholds: TextThresholds,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            runner,
            visual,
            text,
            http: Client::new(),
            uploader,
            frame_thresholds,
            text_thresholds,
            work_dir,
        }
    }

    /// Moderate one video and publish its review. Returns the review id.
    pub async fn process(&self, video_path: &Path) -> WorkerResult<String> {
        let name = video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| video_path.display().to_string());
        let logger = VideoLogger::new(name, "moderation");
        let span = logger.create_span();

        self.process_logged(video_path, &logger).instrument(span).await
    }

    async fn process_logged(&self, video_path: &Path, logger: &VideoLogger) -> WorkerResult<String> {
        let started = Instant::now();
        logger.log_start(&video_path.display().to_string());

        if !video_path.is_file() {
            let err = MediaError::FileNotFound(video_path.to_path_buf());
            logger.log_error(&err.to_string());
            return Err(err.into());
        }

        let workspace = ScopedWorkspace::create(&self.work_dir, logger.video())?;
        let result = self.run_stages(video_path, workspace.path(), logger).await;
        if !workspace.cleanup() {
            logger.log_warning("Work directory was not fully removed");
        }

        match &result {
            Ok(review_id) => logger.log_completion(&format!(
                "review {} published in {:.1?}",
                review_id,
                started.elapsed()
            )),
            Err(e) => logger.log_error(&e.to_string()),
        }
        result
    }

    async fn run_stages(
        &self,
        video_path: &Path,
        work_dir: &Path,
        logger: &VideoLogger,
    ) -> WorkerResult<String> {
        let proxy = compress_video(&self.runner, video_path, work_dir).await?;
        logger.log_progress("proxy compressed");

        let asset = self.visual.moderate(&proxy).await?;
        logger.log_progress("visual moderation finished");

        let (frames, transcript) = moderated_frames(
            &self.http,
            &self.text,
            &asset,
            self.frame_thresholds,
            self.text_thresholds,
            logger,
        )
        .await?;

        self.uploader
            .run(
                ReviewUpload {
                    asset: &asset,
                    frames,
                    transcript: transcript.as_ref(),
                    work_dir,
                },
                logger,
            )
            .await
    }
}

/// Frame events of a moderated asset, raised by its caption scores.
///
/// A malformed report fails before any caption is fetched.
pub async fn moderated_frames(
    http: &Client,
    text: &TextModerator,
    asset: &VisualModerationAsset,
    frame_thresholds: FrameThresholds,
    text_thresholds: TextThresholds,
    logger: &VideoLogger,
) -> WorkerResult<(Vec<FrameEvent>, Option<TranscriptBundle>)> {
    let frames = extract_frame_events(&asset.report_json, frame_thresholds)?;
    logger.log_progress(&format!("{} frame events extracted", frames.len()));

    let transcript = load_transcript(http, text, asset, logger).await;
    let frames = match &transcript {
        Some(transcript) => merge_text_scores(frames, &transcript.captions, text_thresholds),
        None => frames,
    };
    Ok((frames, transcript))
}

/// Download, parse and screen the captions of a moderated asset.
///
/// Returns `None` when there are no usable captions; the video then proceeds
/// without text signals.
pub async fn load_transcript(
    http: &Client,
    text: &TextModerator,
    asset: &VisualModerationAsset,
    logger: &VideoLogger,
) -> Option<TranscriptBundle> {
    let Some(url) = asset.streaming.vtt.as_deref() else {
        logger.log_warning("No caption file published, continuing without transcript");
        return None;
    };

    let source = match fetch_captions(http, url).await {
        Ok(source) => source,
        Err(e) => {
            logger.log_warning(&format!("Caption download failed: {}", e));
            return None;
        }
    };

    let captions = match parse_webvtt(&source) {
        Ok(captions) if !captions.is_empty() => captions,
        Ok(_) => {
            logger.log_warning("Caption file has no cues, continuing without transcript");
            return None;
        }
        Err(e) => {
            logger.log_warning(&format!("Caption parse failed: {}", e));
            return None;
        }
    };

    let captions = text.screen(captions).await;
    logger.log_progress("text moderation finished");
    Some(TranscriptBundle { source, captions })
}
