use crate::llm::error::ExtractionError;
use crate::llm::{Credential, Provider, SubscriptionExtractor, EXTRACTION_PROMPT};
use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Vision extraction through an OpenAI-compatible chat completions endpoint.
///
/// One attempt per call. The credential is passed per request and never stored.
#[derive(Debug, Clone)]
pub struct OpenAiVisionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiVisionClient {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, model, max_tokens, Duration::from_secs(timeout_secs))
    }

    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self::with_http(http, base_url, model, max_tokens))
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            max_tokens,
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, image_png_base64: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{image_png_base64}"),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
            temperature: 0.0,
        }
    }

    fn classify_failure(status: StatusCode, body: &str, credential: &Credential) -> ExtractionError {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = envelope
            .as_ref()
            .and_then(|e| e.error.message.clone())
            .unwrap_or_else(|| format!("HTTP {status}: {body}"));
        let message = credential.scrub(&message);

        let invalid_key = envelope
            .as_ref()
            .and_then(|e| e.error.code.as_deref())
            .is_some_and(|code| code == "invalid_api_key");

        if invalid_key || matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            ExtractionError::AuthenticationFailure {
                provider: Provider::OpenAi,
                message,
            }
        } else {
            ExtractionError::TransportFailure {
                provider: Provider::OpenAi,
                status: Some(status.as_u16()),
                message,
            }
        }
    }

    fn response_text(res: ChatCompletionResponse, raw: &str) -> Result<String, ExtractionError> {
        let Some(choice) = res.choices.into_iter().next() else {
            return Err(ExtractionError::MalformedResponse {
                provider: Provider::OpenAi,
                detail: "response has no choices".to_string(),
                raw_output: Some(raw.to_string()),
            });
        };

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("OpenAI finish_reason=length; reply may be truncated");
        }

        choice
            .message
            .content
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExtractionError::MalformedResponse {
                provider: Provider::OpenAi,
                detail: "response has no text content".to_string(),
                raw_output: Some(raw.to_string()),
            })
    }
}

#[async_trait::async_trait]
impl SubscriptionExtractor for OpenAiVisionClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn complete(
        &self,
        image_png_base64: &str,
        credential: &Credential,
    ) -> Result<String, ExtractionError> {
        let transport = |status: Option<u16>, err: reqwest::Error| ExtractionError::TransportFailure {
            provider: Provider::OpenAi,
            status,
            message: credential.scrub(&err.to_string()),
        };

        let res = self
            .http
            .post(self.url())
            .bearer_auth(credential.expose())
            .json(&self.build_request(image_png_base64))
            .send()
            .await
            .map_err(|e| transport(None, e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| transport(Some(status.as_u16()), e))?;

        if !status.is_success() {
            let err = Self::classify_failure(status, &text, credential);
            tracing::warn!(%status, kind = err.kind(), "OpenAI request rejected");
            return Err(err);
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| {
            ExtractionError::MalformedResponse {
                provider: Provider::OpenAi,
                detail: format!("failed to decode chat completion: {e}"),
                raw_output: Some(text.clone()),
            }
        })?;

        Self::response_text(parsed, &text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}
