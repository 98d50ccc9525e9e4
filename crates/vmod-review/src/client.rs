//! Review tool HTTP client.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use vmod_models::{TranscriptModerationRecord, VideoFrameRecord, VideoReviewRecord};

use crate::api::ReviewApi;
use crate::config::ReviewToolConfig;
use crate::error::{ReviewApiError, ReviewApiResult};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const ZIP_CONTENT_TYPE: &str = "application/x-zip-compressed";
/// Frame timestamps are sent in milliseconds.
const FRAME_TIMESCALE: &str = "1000";

/// `ReviewApi` over the review tool REST API.
pub struct ReviewClient {
    http: Client,
    reviews_url: String,
    subscription_key: String,
}

impl ReviewClient {
    pub fn new(config: &ReviewToolConfig) -> ReviewApiResult<Self> {
        let http = Client::builder().build().map_err(ReviewApiError::Network)?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &ReviewToolConfig) -> Self {
        Self {
            http,
            reviews_url: config.reviews_url(),
            subscription_key: config.api_subscription_key.clone(),
        }
    }

    fn review_url(&self, review_id: &str, operation: &str) -> String {
        format!("{}/{}/{}", self.reviews_url, review_id, operation)
    }

    async fn send(&self, request: RequestBuilder) -> ReviewApiResult<Response> {
        let response = request
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ReviewApiError::from_response(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ReviewApi for ReviewClient {
    async fn create_video_reviews(
        &self,
        reviews: &[VideoReviewRecord],
    ) -> ReviewApiResult<Vec<String>> {
        debug!("Creating {} video review(s)", reviews.len());
        let response = self
            .send(self.http.post(&self.reviews_url).json(reviews))
            .await?;
        let ids: Vec<String> = response.json().await?;
        if ids.len() != reviews.len() {
            return Err(ReviewApiError::InvalidResponse(format!(
                "expected {} review id(s), got {}",
                reviews.len(),
                ids.len()
            )));
        }
        Ok(ids)
    }

    async fn add_video_frames(
        &self,
        review_id: &str,
        frames: &[VideoFrameRecord],
        archive: &Path,
    ) -> ReviewApiResult<()> {
        let bytes = tokio::fs::read(archive).await?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "frames.zip".to_string());
        debug!(
            review_id,
            "Attaching {} frames with {} ({} bytes)",
            frames.len(),
            file_name,
            bytes.len()
        );

        let zip = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(ZIP_CONTENT_TYPE)?;
        let form = Form::new()
            .part("frameImageZip", zip)
            .text("frameMetadata", serde_json::to_string(frames)?);

        self.send(
            self.http
                .post(self.review_url(review_id, "frames"))
                .query(&[("timescale", FRAME_TIMESCALE)])
                .multipart(form),
        )
        .await?;
        Ok(())
    }

    async fn add_transcript(&self, review_id: &str, transcript: &str) -> ReviewApiResult<()> {
        self.send(
            self.http
                .put(self.review_url(review_id, "transcript"))
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(transcript.as_bytes().to_vec()),
        )
        .await?;
        Ok(())
    }

    async fn add_transcript_moderation_results(
        &self,
        review_id: &str,
        results: &[TranscriptModerationRecord],
    ) -> ReviewApiResult<()> {
        self.send(
            self.http
                .put(self.review_url(review_id, "transcriptmoderationresult"))
                .json(results),
        )
        .await?;
        Ok(())
    }

    async fn publish_video_review(&self, review_id: &str) -> ReviewApiResult<()> {
        self.send(self.http.post(self.review_url(review_id, "publish")))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vmod_models::{MetadataPair, ModeratedTerm};
    use wiremock::matchers::{body_json, body_string, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REVIEWS_PATH: &str = "/contentmoderator/review/v1.0/teams/team/reviews";

    fn client(server: &MockServer) -> ReviewClient {
        ReviewClient::new(&ReviewToolConfig {
            api_endpoint: server.uri(),
            api_subscription_key: "key".into(),
            team_id: "team".into(),
            adult_frame_threshold: 0.5,
            racy_frame_threshold: 0.5,
            category1_text_threshold: 0.5,
            category2_text_threshold: 0.5,
            category3_text_threshold: 0.5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_video_reviews_returns_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REVIEWS_PATH))
            .and(header("Ocp-Apim-Subscription-Key", "key"))
            .and(body_string_contains("\"Status\":\"UnPublished\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["201712v1"])))
            .expect(1)
            .mount(&server)
            .await;

        let record = VideoReviewRecord::unpublished("https://stream/manifest", "asset-1", None);
        let ids = client(&server).create_video_reviews(&[record]).await.unwrap();
        assert_eq!(ids, vec!["201712v1"]);
    }

    #[tokio::test]
    async fn test_create_video_reviews_rejects_missing_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REVIEWS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let record = VideoReviewRecord::unpublished("c", "id", None);
        let err = client(&server).create_video_reviews(&[record]).await.unwrap_err();
        assert!(matches!(err, ReviewApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_add_video_frames_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/rev/frames", REVIEWS_PATH)))
            .and(query_param("timescale", "1000"))
            .and(body_string_contains("name=\"frameImageZip\""))
            .and(body_string_contains("application/x-zip-compressed"))
            .and(body_string_contains("name=\"frameMetadata\""))
            .and(body_string_contains("\"FrameImage\":\"rev_1.jpg\""))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("0.zip");
        std::fs::write(&archive, b"PK").unwrap();
        let frames = vec![VideoFrameRecord {
            timestamp: "0".into(),
            frame_image: "rev_1.jpg".into(),
            metadata: vec![MetadataPair::new("ExternalId", "rev_1.jpg")],
            reviewer_result_tags: Vec::new(),
        }];

        client(&server)
            .add_video_frames("rev", &frames, &archive)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_transcript_and_results() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/rev/transcript", REVIEWS_PATH)))
            .and(header("content-type", "text/plain"))
            .and(body_string("WEBVTT\n"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/rev/transcriptmoderationresult", REVIEWS_PATH)))
            .and(body_json(json!([{ "Timestamp": "0", "Terms": [{ "Index": 1, "Term": "darn" }] }])))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client.add_transcript("rev", "WEBVTT\n").await.unwrap();
        client
            .add_transcript_moderation_results(
                "rev",
                &[TranscriptModerationRecord {
                    timestamp: "0".into(),
                    terms: vec![ModeratedTerm { index: 1, term: "darn".into() }],
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_publish_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/rev/publish", REVIEWS_PATH)))
            .respond_with(ResponseTemplate::new(409).set_body_string("already published"))
            .mount(&server)
            .await;

        let err = client(&server).publish_video_review("rev").await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("already published"));
    }
}
