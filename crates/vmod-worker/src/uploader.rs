//! Review upload state machine.
//!
//! One video's review is uploaded in strict stage order: create the review,
//! attach frame batches, attach the transcript and its moderation results,
//! then publish. A failing stage is logged, recorded as the terminal state and
//! returned; nothing is retried or rolled back.

use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use vmod_media::{FrameArchiver, FrameGrab, MediaResult};
use vmod_models::{
    FrameEvent, FrameThresholds, MetadataPair, ReviewStage, ReviewState, TextThresholds,
    TranscriptBundle, TranscriptModerationRecord, VideoFrameRecord, VideoReviewRecord,
    VisualModerationAsset,
};
use vmod_review::ReviewApi;

use crate::error::{WorkerError, WorkerResult};
use crate::frames::{partition, rebind_names};
use crate::logging::VideoLogger;
use crate::summary::VideoReviewSummary;

/// Produces one frame image archive per batch.
#[async_trait]
pub trait FrameImageGenerator: Send + Sync {
    /// Returns archive paths in batch order.
    async fn generate(
        &self,
        video: &Path,
        batches: &[Vec<FrameGrab>],
        work_dir: &Path,
        review_id: &str,
    ) -> MediaResult<Vec<PathBuf>>;
}

#[async_trait]
impl FrameImageGenerator for FrameArchiver {
    async fn generate(
        &self,
        video: &Path,
        batches: &[Vec<FrameGrab>],
        work_dir: &Path,
        review_id: &str,
    ) -> MediaResult<Vec<PathBuf>> {
        FrameArchiver::generate(self, video, batches, work_dir, review_id).await
    }
}

/// Inputs of one review upload.
#[derive(Debug)]
pub struct ReviewUpload<'a> {
    pub asset: &'a VisualModerationAsset,
    /// Merged frame events in extraction order
    pub frames: Vec<FrameEvent>,
    pub transcript: Option<&'a TranscriptBundle>,
    /// Directory receiving frame images and archives
    pub work_dir: &'a Path,
}

/// Uploads moderated videos to the review tool.
pub struct ReviewUploader<R, G> {
    api: R,
    images: G,
    frame_thresholds: FrameThresholds,
    text_thresholds: TextThresholds,
    batch_size: NonZeroUsize,
}

impl<R: ReviewApi, G: FrameImageGenerator> ReviewUploader<R, G> {
    pub fn new(
        api: R,
        images: G,
        frame_thresholds: FrameThresholds,
        text_thresholds: TextThresholds,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self {
            api,
            images,
            frame_thresholds,
            text_thresholds,
            batch_size,
        }
    }

    /// Upload and publish a review. Returns the review id.
    pub async fn run(&self, upload: ReviewUpload<'_>, logger: &VideoLogger) -> WorkerResult<String> {
        let mut state = ReviewState::NotStarted;
        self.run_tracked(upload, logger, &mut state).await
    }

    /// Like [`run`](Self::run), leaving the reached state in `state`.
    pub async fn run_tracked(
        &self,
        upload: ReviewUpload<'_>,
        logger: &VideoLogger,
        state: &mut ReviewState,
    ) -> WorkerResult<String> {
        let ReviewUpload {
            asset,
            frames,
            transcript,
            work_dir,
        } = upload;

        let (review_id, frames) = self.create(asset, frames, transcript, logger, state).await?;
        self.attach_frames(asset, &review_id, frames, transcript.is_some(), work_dir, logger, state)
            .await?;

        match transcript {
            Some(transcript) => {
                self.attach_transcript(&review_id, transcript, logger, state)
                    .await?;
                self.attach_moderation_results(&review_id, transcript, logger, state)
                    .await?;
            }
            None => logger.log_warning("No transcript available, skipping transcript stages"),
        }

        self.publish(&review_id, logger, state).await?;
        Ok(review_id)
    }

    async fn create(
        &self,
        asset: &VisualModerationAsset,
        frames: Vec<FrameEvent>,
        transcript: Option<&TranscriptBundle>,
        logger: &VideoLogger,
        state: &mut ReviewState,
    ) -> WorkerResult<(String, Vec<FrameEvent>)> {
        let stage = ReviewStage::Create;
        let Some(locator) = asset.content_locator() else {
            return Err(fail(state, logger, stage, "no content locator"));
        };
        let summary = VideoReviewSummary::compute(
            &frames,
            self.frame_thresholds,
            transcript.map(|_| self.text_thresholds),
        );
        let record = VideoReviewRecord::unpublished(
            locator,
            asset.video_name.as_str(),
            summary.as_ref().map(VideoReviewSummary::metadata),
        );

        let ids = match self.api.create_video_reviews(&[record]).await {
            Ok(ids) => ids,
            Err(e) => return Err(fail(state, logger, stage, e)),
        };
        let review_id = match ids.as_slice() {
            [id] if !id.is_empty() => id.clone(),
            _ => {
                let cause = format!("expected one review id, got {}", ids.len());
                return Err(fail(state, logger, stage, cause));
            }
        };
        info!(review_id = %review_id, video = %logger.video(), "Review created");

        let frames = match rebind_names(frames, &review_id) {
            Ok(frames) => frames,
            Err(e) => return Err(fail(state, logger, stage, e)),
        };

        *state = ReviewState::Created {
            review_id: review_id.clone(),
        };
        Ok((review_id, frames))
    }

    #[allow(clippy::too_many_arguments)]
    async fn attach_frames(
        &self,
        asset: &VisualModerationAsset,
        review_id: &str,
        frames: Vec<FrameEvent>,
        include_text: bool,
        work_dir: &Path,
        logger: &VideoLogger,
        state: &mut ReviewState,
    ) -> WorkerResult<()> {
        let stage = ReviewStage::AttachFrames;
        let batches = partition(frames, self.batch_size);

        if batches.is_empty() {
            logger.log_warning("Report has no frame events, no frames attached");
        } else {
            let grabs: Vec<Vec<FrameGrab>> = batches
                .iter()
                .map(|batch| batch.iter().map(FrameGrab::from).collect())
                .collect();
            let archives = match self
                .images
                .generate(&asset.video_path, &grabs, work_dir, review_id)
                .await
            {
                Ok(archives) => archives,
                Err(e) => return Err(fail(state, logger, stage, e)),
            };
            if archives.len() != batches.len() {
                let cause = format!(
                    "{} frame archives generated for {} batches",
                    archives.len(),
                    batches.len()
                );
                return Err(fail(state, logger, stage, cause));
            }

            for (index, (batch, archive)) in batches.iter().zip(&archives).enumerate() {
                let records: Vec<VideoFrameRecord> = batch
                    .iter()
                    .map(|frame| frame_record(frame, include_text))
                    .collect();
                if let Err(e) = self.api.add_video_frames(review_id, &records, archive).await {
                    let cause = format!("batch {}: {}", index, e);
                    return Err(fail(state, logger, stage, cause));
                }
                logger.log_batch(review_id, index, batches.len(), records.len());
            }
        }

        *state = ReviewState::FramesAttached {
            review_id: review_id.to_string(),
        };
        Ok(())
    }

    async fn attach_transcript(
        &self,
        review_id: &str,
        transcript: &TranscriptBundle,
        logger: &VideoLogger,
        state: &mut ReviewState,
    ) -> WorkerResult<()> {
        if let Err(e) = self.api.add_transcript(review_id, &transcript.source).await {
            return Err(fail(state, logger, ReviewStage::AttachTranscript, e));
        }
        info!(review_id, video = %logger.video(), "Transcript attached");
        *state = ReviewState::TranscriptAttached {
            review_id: review_id.to_string(),
        };
        Ok(())
    }

    async fn attach_moderation_results(
        &self,
        review_id: &str,
        transcript: &TranscriptBundle,
        logger: &VideoLogger,
        state: &mut ReviewState,
    ) -> WorkerResult<()> {
        let records = transcript_moderation_records(transcript);
        if records.is_empty() {
            debug!(review_id, "No flagged caption terms to attach");
            return Ok(());
        }

        if let Err(e) = self
            .api
            .add_transcript_moderation_results(review_id, &records)
            .await
        {
            return Err(fail(state, logger, ReviewStage::AttachModerationResults, e));
        }
        info!(
            review_id,
            video = %logger.video(),
            "Attached moderation results for {} captions",
            records.len()
        );
        Ok(())
    }

    async fn publish(
        &self,
        review_id: &str,
        logger: &VideoLogger,
        state: &mut ReviewState,
    ) -> WorkerResult<()> {
        if let Err(e) = self.api.publish_video_review(review_id).await {
            return Err(fail(state, logger, ReviewStage::Publish, e));
        }
        *state = ReviewState::Published {
            review_id: review_id.to_string(),
        };
        Ok(())
    }
}

/// Log a failed stage, record it in `state` and build its error.
fn fail(
    state: &mut ReviewState,
    logger: &VideoLogger,
    stage: ReviewStage,
    cause: impl Display,
) -> WorkerError {
    logger.log_stage_failure(stage, state.review_id(), &cause);
    *state = ReviewState::Failed {
        stage,
        cause: cause.to_string(),
    };
    WorkerError::stage_failed(stage, cause)
}

/// Attach-frames payload entry for one frame.
fn frame_record(frame: &FrameEvent, include_text: bool) -> VideoFrameRecord {
    let name = frame.frame_name.to_string();
    let mut metadata = vec![
        MetadataPair::flag("Review Recommended", frame.review_recommended),
        MetadataPair::new("Adult Score", frame.adult_score.as_str()),
        MetadataPair::flag("a", frame.is_adult),
        MetadataPair::new("Racy Score", frame.racy_score.as_str()),
        MetadataPair::flag("r", frame.is_racy),
        MetadataPair::new("ExternalId", name.as_str()),
    ];
    if include_text {
        metadata.extend([
            MetadataPair::flag("at", frame.is_adult_text),
            MetadataPair::flag("rt", frame.is_racy_text),
            MetadataPair::flag("ot", frame.is_offensive_text),
        ]);
    }

    VideoFrameRecord {
        timestamp: frame.timestamp_ms.to_string(),
        frame_image: name,
        metadata,
        reviewer_result_tags: Vec::new(),
    }
}

/// Flagged terms per caption; captions without terms are omitted.
fn transcript_moderation_records(transcript: &TranscriptBundle) -> Vec<TranscriptModerationRecord> {
    transcript
        .captions
        .iter()
        .filter(|caption| !caption.terms.is_empty())
        .map(|caption| TranscriptModerationRecord {
            timestamp: caption.start_ms.to_string(),
            terms: caption.terms.clone(),
        })
        .collect()
}
