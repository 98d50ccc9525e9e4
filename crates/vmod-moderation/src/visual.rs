//! Visual moderation jobs.
//!
//! The media service runs an encode plus a video analyzer over an uploaded
//! asset. [`VisualModerator`] drives one job from upload to downloaded report
//! against any [`MediaJobApi`], polling job state through a [`Sleeper`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vmod_models::{StreamingUrls, VisualModerationAsset};

use crate::error::{ModerationError, ModerationResult};
use crate::sleeper::Sleeper;

/// Transform producing a streamable encode and the moderation analysis.
pub const VISUAL_MODERATION_TRANSFORM: &str = "VisualModerationTransform";
/// Report file written by the video analyzer.
pub const REPORT_FILE_NAME: &str = "contentmoderation.json";
/// Suffix of the caption file written by the video analyzer.
pub const TRANSCRIPT_FILE_SUFFIX: &str = "transcript.vtt";
/// Default interval between job state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Media service job state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Scheduled,
    Processing,
    Canceling,
    Finished,
    Error,
    Canceled,
    Other(String),
}

impl JobState {
    pub fn parse(value: &str) -> Self {
        match value {
            "Queued" => JobState::Queued,
            "Scheduled" => JobState::Scheduled,
            "Processing" => JobState::Processing,
            "Canceling" => JobState::Canceling,
            "Finished" => JobState::Finished,
            "Error" => JobState::Error,
            "Canceled" => JobState::Canceled,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Error | JobState::Canceled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Other(state) => f.write_str(state),
            state => write!(f, "{:?}", state),
        }
    }
}

/// Observed job state plus the first output error, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub error_message: Option<String>,
}

/// Streaming policy of a published locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorPolicy {
    ClearStreamingOnly,
    DownloadOnly,
}

impl LocatorPolicy {
    pub fn policy_name(&self) -> &'static str {
        match self {
            LocatorPolicy::ClearStreamingOnly => "Predefined_ClearStreamingOnly",
            LocatorPolicy::DownloadOnly => "Predefined_DownloadOnly",
        }
    }
}

/// Operations of the media service used by a moderation job.
#[async_trait]
pub trait MediaJobApi: Send + Sync {
    /// Create the transform unless it already exists.
    async fn ensure_transform(&self, transform: &str) -> ModerationResult<()>;

    async fn create_asset(&self, asset: &str) -> ModerationResult<()>;

    /// Upload a local file into an asset's container.
    async fn upload_file(&self, asset: &str, file: &Path) -> ModerationResult<()>;

    async fn submit_job(
        &self,
        transform: &str,
        job: &str,
        input_asset: &str,
        output_assets: &[String],
    ) -> ModerationResult<()>;

    async fn job_status(&self, transform: &str, job: &str) -> ModerationResult<JobStatus>;

    async fn publish_locator(
        &self,
        locator: &str,
        asset: &str,
        policy: LocatorPolicy,
    ) -> ModerationResult<()>;

    /// Resolve streaming URLs of the video locator and the caption download
    /// URL of the analysis locator.
    async fn streaming_urls(
        &self,
        video_locator: &str,
        analysis_locator: &str,
    ) -> ModerationResult<StreamingUrls>;

    /// Download a text file from an asset's container.
    async fn download_text(&self, asset: &str, file_name: &str) -> ModerationResult<String>;
}

/// Unique resource names for one moderation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationJobNames {
    pub job: String,
    pub input_asset: String,
    pub video_asset: String,
    pub analysis_asset: String,
    pub video_locator: String,
    pub analysis_locator: String,
}

impl ModerationJobNames {
    pub fn new() -> Self {
        Self::with_uniqueness(&Uuid::new_v4().to_string())
    }

    pub fn with_uniqueness(uniqueness: &str) -> Self {
        Self {
            job: format!("job-{}", uniqueness),
            input_asset: format!("asset-input-{}", uniqueness),
            video_asset: format!("asset-output-video-{}", uniqueness),
            analysis_asset: format!("asset-output-analysis-{}", uniqueness),
            video_locator: format!("streaminglocator-video-{}", uniqueness),
            analysis_locator: format!("streaminglocator-analysis-{}", uniqueness),
        }
    }
}

impl Default for ModerationJobNames {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs visual moderation jobs.
pub struct VisualModerator<A, S> {
    api: A,
    sleeper: S,
    poll_interval: Duration,
}

impl<A: MediaJobApi, S: Sleeper> VisualModerator<A, S> {
    pub fn new(api: A, sleeper: S, poll_interval: Duration) -> Self {
        Self {
            api,
            sleeper,
            poll_interval,
        }
    }

    /// Moderate a local video file.
    pub async fn moderate(&self, video_path: &Path) -> ModerationResult<VisualModerationAsset> {
        self.moderate_with_names(video_path, ModerationJobNames::new())
            .await
    }

    pub async fn moderate_with_names(
        &self,
        video_path: &Path,
        names: ModerationJobNames,
    ) -> ModerationResult<VisualModerationAsset> {
        self.api.ensure_transform(VISUAL_MODERATION_TRANSFORM).await?;

        self.api.create_asset(&names.input_asset).await?;
        info!("Uploading {} to {}", video_path.display(), names.input_asset);
        self.api.upload_file(&names.input_asset, video_path).await?;

        self.api.create_asset(&names.video_asset).await?;
        self.api.create_asset(&names.analysis_asset).await?;

        let outputs = [names.video_asset.clone(), names.analysis_asset.clone()];
        self.api
            .submit_job(
                VISUAL_MODERATION_TRANSFORM,
                &names.job,
                &names.input_asset,
                &outputs,
            )
            .await?;
        info!(job = %names.job, "Moderation job submitted");

        let status = self.wait_for_job(&names.job).await?;
        if status.state != JobState::Finished {
            let message = status
                .error_message
                .unwrap_or_else(|| "no error details".to_string());
            warn!(job = %names.job, state = %status.state, "Moderation job did not finish: {}", message);
            return Err(ModerationError::JobFailed {
                job: names.job,
                state: status.state.to_string(),
                message,
            });
        }
        info!(job = %names.job, "Moderation job finished");

        self.api
            .publish_locator(
                &names.video_locator,
                &names.video_asset,
                LocatorPolicy::ClearStreamingOnly,
            )
            .await?;
        self.api
            .publish_locator(
                &names.analysis_locator,
                &names.analysis_asset,
                LocatorPolicy::DownloadOnly,
            )
            .await?;

        let streaming = self
            .api
            .streaming_urls(&names.video_locator, &names.analysis_locator)
            .await?;
        let report_json = self
            .api
            .download_text(&names.analysis_asset, REPORT_FILE_NAME)
            .await?;

        Ok(VisualModerationAsset {
            report_json,
            video_name: names.video_asset,
            video_path: video_path.to_path_buf(),
            streaming,
        })
    }

    /// Poll until the job reaches a terminal state. There is no deadline.
    async fn wait_for_job(&self, job: &str) -> ModerationResult<JobStatus> {
        let mut polls = 0u32;
        loop {
            let status = self
                .api
                .job_status(VISUAL_MODERATION_TRANSFORM, job)
                .await?;
            polls += 1;
            if status.state.is_terminal() {
                debug!(job, polls, state = %status.state, "Moderation job reached terminal state");
                return Ok(status);
            }
            debug!(job, polls, state = %status.state, "Moderation job running");
            self.sleeper.sleep(self.poll_interval).await;
        }
    }
}

/// Assemble published URLs from a streaming host and locator paths.
pub fn resolve_streaming_urls(
    host: &str,
    streaming_paths: &[(String, Vec<String>)],
    download_paths: &[String],
) -> StreamingUrls {
    let url = |path: &str| format!("https://{}{}", host.trim_end_matches('/'), path);
    let mut urls = StreamingUrls::default();

    for (protocol, paths) in streaming_paths {
        let Some(first) = paths.first() else {
            continue;
        };
        match protocol.as_str() {
            "SmoothStreaming" => urls.smooth = Some(url(first)),
            "Dash" => urls.dash = Some(url(first)),
            "Hls" => urls.hls = Some(url(first)),
            _ => {}
        }
    }

    urls.vtt = download_paths
        .iter()
        .find(|p| p.ends_with(TRANSCRIPT_FILE_SUFFIX))
        .map(|p| url(p));

    urls
}
