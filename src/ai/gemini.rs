use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::{ChartImage, ServiceError, VisionModel};
use crate::config::Config;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for the Generative Language `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.gemini_api_key.clone(),
            model: cfg.gemini_model.clone(),
            base_url: cfg.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request<'a>(prompt: &'a str, images: &[ChartImage]) -> GenerateRequest<'a> {
        let engine = base64::engine::general_purpose::STANDARD;
        let mut parts = vec![Part::Text { text: prompt }];
        parts.extend(images.iter().map(|img| Part::Image {
            inline_data: InlineData {
                mime_type: img.mime_type(),
                data: engine.encode(&img.bytes),
            },
        }));
        GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                response_mime_type: "application/json",
            },
        }
    }
}

/// Map a non-success HTTP reply to a `ServiceError`, preferring the
/// service's own error message over the raw body.
fn error_from_response(status: u16, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("AI service returned HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });
    ServiceError::with_status(status, message)
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, prompt: &str, images: &[ChartImage]) -> Result<String, ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::new("GEMINI_API_KEY is not configured"));
        }

        let body = Self::build_request(prompt, images);
        debug!("POST {} with {} image(s)", self.endpoint(), images.len());

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::new(format!("Failed to reach AI service: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), &text));
        }

        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ServiceError::new(format!("Failed to parse AI response: {e}")))?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ServiceError::new("AI service returned an empty response"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_prompt_then_inline_images() {
        let png = crate::test_helpers::make_png(8, 4);
        let images = vec![ChartImage::new("chart.png", png)];
        let req = GeminiClient::build_request("analyze", &images);
        let value = serde_json::to_value(&req).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "analyze");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert!(!parts[1]["inline_data"]["data"].as_str().unwrap().is_empty());
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn error_body_message_is_extracted() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded: daily limit","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = error_from_response(429, body);
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "Quota exceeded: daily limit");
        assert!(err.is_retryable());
    }

    #[test]
    fn non_json_error_body_falls_back() {
        assert_eq!(error_from_response(503, "overloaded").message, "overloaded");
        assert_eq!(
            error_from_response(500, "").message,
            "AI service returned HTTP 500"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let mut cfg = crate::test_helpers::default_test_config();
        cfg.gemini_api_key = String::new();
        let client = GeminiClient::new(&cfg);
        let err = client.generate("x", &[]).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
