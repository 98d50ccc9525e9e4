//! Media service REST client.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;
use validator::Validate;

use vmod_models::StreamingUrls;

use crate::error::{ModerationError, ModerationResult};
use crate::visual::{resolve_streaming_urls, JobState, JobStatus, LocatorPolicy, MediaJobApi};

const DEFAULT_API_VERSION: &str = "2018-07-01";
/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Lifetime of container SAS URLs requested for uploads and downloads.
const SAS_LIFETIME_HOURS: i64 = 4;

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// Media service account and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VisualModeratorConfig {
    #[validate(url)]
    pub aad_endpoint: String,
    #[validate(length(min = 1))]
    pub aad_tenant_id: String,
    #[validate(length(min = 1))]
    pub aad_client_id: String,
    #[validate(length(min = 1))]
    pub aad_client_secret: String,
    #[validate(length(min = 1))]
    pub subscription_id: String,
    #[validate(length(min = 1))]
    pub resource_group: String,
    #[validate(length(min = 1))]
    pub account_name: String,
    #[validate(url)]
    pub arm_aad_audience: String,
    #[validate(url)]
    pub arm_endpoint: String,
    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(min = 1))]
    pub poll_interval_secs: u64,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl VisualModeratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn account_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Media/mediaServices/{}",
            self.arm_endpoint.trim_end_matches('/'),
            self.subscription_id,
            self.resource_group,
            self.account_name
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.aad_endpoint.trim_end_matches('/'),
            self.aad_tenant_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
}

impl TokenResponse {
    /// `expires_in` arrives either as a number or as numeric text.
    fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        Duration::from_secs(secs.unwrap_or(3600))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// `MediaJobApi` over the Media Services REST API.
pub struct ArmMediaClient {
    http: Client,
    config: VisualModeratorConfig,
    token: Mutex<Option<CachedToken>>,
}

impl ArmMediaClient {
    pub fn new(config: VisualModeratorConfig) -> ModerationResult<Self> {
        let http = Client::builder().build().map_err(ModerationError::Network)?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: VisualModeratorConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    /// Bearer token for management calls, fetched with client credentials.
    async fn access_token(&self) -> ModerationResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Requesting media service token");
        let response = self
            .http
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.aad_client_id.as_str()),
                ("client_secret", self.config.aad_client_secret.as_str()),
                ("resource", self.config.arm_aad_audience.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModerationError::AuthFailed(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.lifetime().saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.account_url(), path)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> ModerationResult<reqwest::Response> {
        let token = self.access_token().await?;
        let mut request = self
            .http
            .request(method, self.resource_url(path))
            .bearer_auth(token)
            .query(&[("api-version", self.config.api_version.as_str())]);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Ok(request.send().await?)
    }

    /// Send a management call and decode its JSON body.
    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> ModerationResult<Value> {
        let response = self.send(method, path, body).await?;
        if !response.status().is_success() {
            return Err(ModerationError::from_response(response).await);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn container_sas_url(&self, asset: &str, permissions: &str) -> ModerationResult<Url> {
        let expiry = Utc::now() + chrono::Duration::hours(SAS_LIFETIME_HOURS);
        let body = json!({
            "permissions": permissions,
            "expiryTime": expiry.to_rfc3339(),
        });
        let value = self
            .call(
                reqwest::Method::POST,
                &format!("assets/{}/listContainerSas", asset),
                Some(body),
            )
            .await?;
        let first = value["assetContainerSasUrls"]
            .as_array()
            .and_then(|urls| urls.first())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ModerationError::invalid_response(format!("no container SAS URL for {}", asset))
            })?;
        Ok(Url::parse(first)?)
    }

    async fn list_paths(&self, locator: &str) -> ModerationResult<Value> {
        self.call(
            reqwest::Method::POST,
            &format!("streamingLocators/{}/listPaths", locator),
            None,
        )
        .await
    }
}

/// Address of `file_name` inside a SAS-signed container URL.
fn blob_url(container: &Url, file_name: &str) -> ModerationResult<Url> {
    let mut url = container.clone();
    url.path_segments_mut()
        .map_err(|_| ModerationError::invalid_response("container URL cannot hold a blob path"))?
        .pop_if_empty()
        .push(file_name);
    Ok(url)
}

/// Body of the transform creating a streaming encode plus moderation analysis.
fn transform_body() -> Value {
    json!({
        "properties": {
            "description": "Adaptive streaming encode with content moderation",
            "outputs": [
                {
                    "onError": "StopProcessingJob",
                    "relativePriority": "Normal",
                    "preset": {
                        "@odata.type": "#Microsoft.Media.BuiltInStandardEncoderPreset",
                        "presetName": "AdaptiveStreaming"
                    }
                },
                {
                    "onError": "StopProcessingJob",
                    "relativePriority": "Normal",
                    "preset": {
                        "@odata.type": "#Microsoft.Media.VideoAnalyzerPreset",
                        "audioLanguage": "en-US",
                        "insightsToExtract": "AllInsights"
                    }
                }
            ]
        }
    })
}

fn parse_job_status(value: &Value) -> ModerationResult<JobStatus> {
    let state = value["properties"]["state"]
        .as_str()
        .ok_or_else(|| ModerationError::invalid_response("job has no state"))?;

    let error_message = value["properties"]["outputs"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|output| {
            let error = &output["error"];
            error["details"]
                .as_array()
                .and_then(|d| d.first())
                .and_then(|d| d["message"].as_str())
                .or_else(|| error["message"].as_str())
        })
        .next()
        .map(str::to_string);

    Ok(JobStatus {
        state: JobState::parse(state),
        error_message,
    })
}

fn parse_streaming_paths(value: &Value) -> Vec<(String, Vec<String>)> {
    value["streamingPaths"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let protocol = entry["streamingProtocol"].as_str()?.to_string();
            let paths = entry["paths"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            Some((protocol, paths))
        })
        .collect()
}

fn parse_download_paths(value: &Value) -> Vec<String> {
    value["downloadPaths"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl MediaJobApi for ArmMediaClient {
    async fn ensure_transform(&self, transform: &str) -> ModerationResult<()> {
        let path = format!("transforms/{}", transform);
        let response = self.send(reqwest::Method::GET, &path, None).await?;
        match response.status() {
            status if status.is_success() => {
                debug!("Transform {} exists", transform);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                info!("Creating transform {}", transform);
                self.call(reqwest::Method::PUT, &path, Some(transform_body()))
                    .await
                    .map(|_| ())
            }
            _ => Err(ModerationError::from_response(response).await),
        }
    }

    async fn create_asset(&self, asset: &str) -> ModerationResult<()> {
        self.call(
            reqwest::Method::PUT,
            &format!("assets/{}", asset),
            Some(json!({ "properties": {} })),
        )
        .await
        .map(|_| ())
    }

    async fn upload_file(&self, asset: &str, file: &Path) -> ModerationResult<()> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ModerationError::invalid_response("upload path has no file name"))?;
        let container = self.container_sas_url(asset, "ReadWrite").await?;
        let url = blob_url(&container, &file_name)?;
        let bytes = tokio::fs::read(file).await?;

        debug!("Uploading {} bytes as {}", bytes.len(), file_name);
        let response = self
            .http
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ModerationError::from_response(response).await);
        }
        Ok(())
    }

    async fn submit_job(
        &self,
        transform: &str,
        job: &str,
        input_asset: &str,
        output_assets: &[String],
    ) -> ModerationResult<()> {
        let outputs: Vec<Value> = output_assets
            .iter()
            .map(|name| {
                json!({
                    "@odata.type": "#Microsoft.Media.JobOutputAsset",
                    "assetName": name
                })
            })
            .collect();
        let body = json!({
            "properties": {
                "input": {
                    "@odata.type": "#Microsoft.Media.JobInputAsset",
                    "assetName": input_asset
                },
                "outputs": outputs
            }
        });
        self.call(
            reqwest::Method::PUT,
            &format!("transforms/{}/jobs/{}", transform, job),
            Some(body),
        )
        .await
        .map(|_| ())
    }

    async fn job_status(&self, transform: &str, job: &str) -> ModerationResult<JobStatus> {
        let value = self
            .call(
                reqwest::Method::GET,
                &format!("transforms/{}/jobs/{}", transform, job),
                None,
            )
            .await?;
        parse_job_status(&value)
    }

    async fn publish_locator(
        &self,
        locator: &str,
        asset: &str,
        policy: LocatorPolicy,
    ) -> ModerationResult<()> {
        let body = json!({
            "properties": {
                "assetName": asset,
                "streamingPolicyName": policy.policy_name()
            }
        });
        self.call(
            reqwest::Method::PUT,
            &format!("streamingLocators/{}", locator),
            Some(body),
        )
        .await
        .map(|_| ())
    }

    async fn streaming_urls(
        &self,
        video_locator: &str,
        analysis_locator: &str,
    ) -> ModerationResult<StreamingUrls> {
        let endpoint = self
            .call(reqwest::Method::GET, "streamingEndpoints/default", None)
            .await?;
        let host = endpoint["properties"]["hostName"]
            .as_str()
            .ok_or_else(|| ModerationError::invalid_response("streaming endpoint has no host"))?
            .to_string();

        let video_paths = self.list_paths(video_locator).await?;
        let analysis_paths = self.list_paths(analysis_locator).await?;

        Ok(resolve_streaming_urls(
            &host,
            &parse_streaming_paths(&video_paths),
            &parse_download_paths(&analysis_paths),
        ))
    }

    async fn download_text(&self, asset: &str, file_name: &str) -> ModerationResult<String> {
        let container = self.container_sas_url(asset, "Read").await?;
        let url = blob_url(&container, file_name)?;
        let response = self.http.get(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.text().await?),
            StatusCode::NOT_FOUND => Err(ModerationError::ReportNotFound(format!(
                "{} in {}",
                file_name, asset
            ))),
            _ => Err(ModerationError::from_response(response).await),
        }
    }
}
