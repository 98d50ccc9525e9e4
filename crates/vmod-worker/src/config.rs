//! Application configuration.
//!
//! Settings come from an optional JSON file overlaid by `VMOD__SECTION__FIELD`
//! environment variables, and are validated once before any video is touched.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use vmod_moderation::{TextModeratorConfig, VisualModeratorConfig};
use vmod_review::ReviewToolConfig;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "VMOD";
/// Frame events per review upload batch.
pub const DEFAULT_FRAME_BATCH_SIZE: usize = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Worker settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorkerConfig {
    /// Work directory for temporary files
    pub work_dir: PathBuf,
    /// Maximum concurrent FFmpeg processes when grabbing frames
    #[validate(range(min = 1))]
    pub max_ffmpeg_processes: usize,
    /// Frame events per upload batch
    #[validate(range(min = 1))]
    pub frame_batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vmod"),
            max_ffmpeg_processes: vmod_media::DEFAULT_MAX_FFMPEG_PROCESSES,
            frame_batch_size: DEFAULT_FRAME_BATCH_SIZE,
        }
    }
}

impl WorkerConfig {
    pub fn batch_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.frame_batch_size).unwrap_or(NonZeroUsize::MIN)
    }
}

/// All settings required to process videos.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub visual_moderator: VisualModeratorConfig,
    #[validate(nested)]
    pub text_moderator: TextModeratorConfig,
    #[validate(nested)]
    pub review_tool: ReviewToolConfig,
    #[serde(default)]
    #[validate(nested)]
    pub worker: WorkerConfig,
}

impl AppConfig {
    /// Load from `path` (or `appsettings.json` if present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Load with an explicit environment map instead of the process environment.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const SETTINGS: &str = r#"{
        "visual_moderator": {
            "aad_endpoint": "https://login.microsoftonline.com",
            "aad_tenant_id": "tenant",
            "aad_client_id": "client",
            "aad_client_secret": "secret",
            "subscription_id": "sub",
            "resource_group": "rg",
            "account_name": "acct",
            "arm_aad_audience": "https://management.core.windows.net/",
            "arm_endpoint": "https://management.azure.com"
        },
        "text_moderator": {
            "api_endpoint": "https://westus.api.cognitive.microsoft.com",
            "api_subscription_key": "text-key"
        },
        "review_tool": {
            "api_endpoint": "https://westus.api.cognitive.microsoft.com",
            "api_subscription_key": "review-key",
            "team_id": "team",
            "adult_frame_threshold": 0.5,
            "racy_frame_threshold": 0.5,
            "category1_text_threshold": 0.5,
            "category2_text_threshold": 0.5,
            "category3_text_threshold": 0.5
        }
    }"#;

    fn settings_file(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("appsettings.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_file_with_defaults() {
        let (_dir, path) = settings_file(SETTINGS);
        let config = AppConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap();

        assert_eq!(config.review_tool.team_id, "team");
        assert_eq!(config.visual_moderator.poll_interval_secs, 10);
        assert_eq!(config.worker.frame_batch_size, 500);
        assert_eq!(config.worker.max_ffmpeg_processes, 4);
        assert!(config.worker.work_dir.ends_with("vmod"));
    }

    #[test]
    fn test_env_overrides_file() {
        let (_dir, path) = settings_file(SETTINGS);
        let env = HashMap::from([
            ("VMOD__REVIEW_TOOL__TEAM_ID".to_string(), "other-team".to_string()),
            ("VMOD__WORKER__FRAME_BATCH_SIZE".to_string(), "250".to_string()),
            ("VMOD__REVIEW_TOOL__RACY_FRAME_THRESHOLD".to_string(), "0.7".to_string()),
        ]);
        let config = AppConfig::load_with_env(Some(&path), Some(env)).unwrap();

        assert_eq!(config.review_tool.team_id, "other-team");
        assert_eq!(config.worker.frame_batch_size, 250);
        assert_eq!(config.review_tool.racy_frame_threshold, 0.7);
    }

    #[test]
    fn test_missing_section_fails() {
        let (_dir, path) = settings_file(r#"{ "text_moderator": { "api_endpoint": "https://x", "api_subscription_key": "k" } }"#);
        let err = AppConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_invalid_threshold_fails_validation() {
        let (_dir, path) = settings_file(SETTINGS);
        let env = HashMap::from([(
            "VMOD__REVIEW_TOOL__ADULT_FRAME_THRESHOLD".to_string(),
            "1.5".to_string(),
        )]);
        let err = AppConfig::load_with_env(Some(&path), Some(env)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_batch_size_fails_validation() {
        let (_dir, path) = settings_file(SETTINGS);
        let env = HashMap::from([("VMOD__WORKER__FRAME_BATCH_SIZE".to_string(), "0".to_string())]);
        let err = AppConfig::load_with_env(Some(&path), Some(env)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
