//! Text screening of caption cues.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

use vmod_models::{CaptionSegment, ModeratedTerm, TextClassification};

use crate::error::{ModerationError, ModerationResult};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Text moderation service settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TextModeratorConfig {
    #[validate(url)]
    pub api_endpoint: String,
    #[validate(length(min = 1))]
    pub api_subscription_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLanguageResponse {
    detected_language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScreenResponse {
    classification: Option<ScreenClassification>,
    #[serde(default)]
    terms: Option<Vec<ScreenTerm>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScreenClassification {
    category1: Option<CategoryScore>,
    category2: Option<CategoryScore>,
    category3: Option<CategoryScore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CategoryScore {
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScreenTerm {
    index: i64,
    term: String,
}

impl ScreenClassification {
    fn scores(&self) -> TextClassification {
        let score = |c: &Option<CategoryScore>| c.as_ref().map_or(0.0, |c| c.score);
        TextClassification {
            category1_score: score(&self.category1),
            category2_score: score(&self.category2),
            category3_score: score(&self.category3),
        }
    }
}

/// Screens caption cues with the text moderation service.
pub struct TextModerator {
    http: Client,
    config: TextModeratorConfig,
}

impl TextModerator {
    pub fn new(config: TextModeratorConfig) -> ModerationResult<Self> {
        let http = Client::builder().build().map_err(ModerationError::Network)?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: TextModeratorConfig) -> Self {
        Self { http, config }
    }

    /// Classify every cue. A cue whose calls fail stays unclassified.
    pub async fn screen(&self, captions: Vec<CaptionSegment>) -> Vec<CaptionSegment> {
        let total = captions.len();
        let mut classified = 0usize;
        let mut screened = Vec::with_capacity(total);

        for mut caption in captions {
            let text = caption.screening_text();
            if text.trim().is_empty() {
                screened.push(caption);
                continue;
            }

            match self.screen_text(&text).await {
                Ok((classification, terms)) => {
                    caption.classification = classification;
                    caption.terms = terms;
                    if caption.classification.is_some() {
                        classified += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        start_ms = caption.start_ms,
                        "Text screening failed for caption: {}", e
                    );
                }
            }
            screened.push(caption);
        }

        info!("Screened {} of {} captions", classified, total);
        screened
    }

    async fn screen_text(
        &self,
        text: &str,
    ) -> ModerationResult<(Option<TextClassification>, Vec<ModeratedTerm>)> {
        let language = self.detect_language(text).await?;
        debug!(language = %language, "Screening caption text");

        let response = self
            .http
            .post(self.url("ProcessText/Screen"))
            .query(&[
                ("language", language.as_str()),
                ("autocorrect", "False"),
                ("PII", "False"),
                ("classify", "True"),
            ])
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_subscription_key)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(text.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ModerationError::from_response(response).await);
        }

        let screen: ScreenResponse = response.json().await?;
        let terms = screen
            .terms
            .unwrap_or_default()
            .into_iter()
            .map(|t| ModeratedTerm {
                index: t.index,
                term: t.term,
            })
            .collect();
        Ok((screen.classification.as_ref().map(ScreenClassification::scores), terms))
    }

    async fn detect_language(&self, text: &str) -> ModerationResult<String> {
        let response = self
            .http
            .post(self.url("ProcessText/DetectLanguage"))
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.api_subscription_key)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(text.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ModerationError::from_response(response).await);
        }

        let detected: DetectLanguageResponse = response.json().await?;
        detected
            .detected_language
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ModerationError::invalid_response("no language detected"))
    }

    fn url(&self, operation: &str) -> String {
        format!(
            "{}/contentmoderator/moderate/v1.0/{}",
            self.config.api_endpoint.trim_end_matches('/'),
            operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn moderator(server: &MockServer) -> TextModerator {
        TextModerator::new(TextModeratorConfig {
            api_endpoint: server.uri(),
            api_subscription_key: "key".into(),
        })
        .unwrap()
    }

    async fn mount_detect(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/contentmoderator/moderate/v1.0/ProcessText/DetectLanguage"))
            .and(header("Ocp-Apim-Subscription-Key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "DetectedLanguage": "eng" })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_screen_records_classification_and_terms() {
        let server = MockServer::start().await;
        mount_detect(&server).await;
        Mock::given(method("POST"))
            .and(path("/contentmoderator/moderate/v1.0/ProcessText/Screen"))
            .and(query_param("language", "eng"))
            .and(query_param("classify", "True"))
            .and(body_string("oh darn it"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Classification": {
                    "Category1": { "Score": 0.8 },
                    "Category2": { "Score": 0.2 },
                    "Category3": { "Score": 0.05 },
                    "ReviewRecommended": true
                },
                "Terms": [{ "Index": 3, "OriginalIndex": 3, "ListId": 0, "Term": "darn" }]
            })))
            .mount(&server)
            .await;

        let captions = vec![CaptionSegment::new(0, 1000, vec!["oh darn".into(), "it".into()])];
        let screened = moderator(&server).screen(captions).await;

        let classification = screened[0].classification.unwrap();
        assert_eq!(classification.category1_score, 0.8);
        assert_eq!(classification.category3_score, 0.05);
        assert_eq!(screened[0].terms, vec![ModeratedTerm { index: 3, term: "darn".into() }]);
    }

    #[tokio::test]
    async fn test_screen_failure_leaves_caption_unclassified() {
        let server = MockServer::start().await;
        mount_detect(&server).await;
        Mock::given(method("POST"))
            .and(path("/contentmoderator/moderate/v1.0/ProcessText/Screen"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let captions = vec![
            CaptionSegment::new(0, 1000, vec!["first".into()]),
            CaptionSegment::new(1000, 2000, vec!["second".into()]),
        ];
        let screened = moderator(&server).screen(captions).await;

        assert_eq!(screened.len(), 2);
        assert!(screened.iter().all(|c| c.classification.is_none()));
        assert_eq!(screened[1].start_ms, 1000);
    }

    #[tokio::test]
    async fn test_screen_skips_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let screened = moderator(&server)
            .screen(vec![CaptionSegment::new(0, 10, vec![])])
            .await;
        assert!(screened[0].classification.is_none());
    }

    #[tokio::test]
    async fn test_screen_without_classification() {
        let server = MockServer::start().await;
        mount_detect(&server).await;
        Mock::given(method("POST"))
            .and(path("/contentmoderator/moderate/v1.0/ProcessText/Screen"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Classification": null, "Terms": null })))
            .mount(&server)
            .await;

        let screened = moderator(&server)
            .screen(vec![CaptionSegment::new(0, 10, vec!["fine".into()])])
            .await;
        assert!(screened[0].classification.is_none());
        assert!(screened[0].terms.is_empty());
    }
}
