pub mod error;
pub mod fixture;
pub mod json;
pub mod openai;

use crate::config::{ExtractorKind, Settings};
use crate::domain::contract::Extraction;
use crate::llm::error::ExtractionError;
use crate::screenshot::Screenshot;
use std::fmt;
use std::sync::Arc;

/// Instruction sent alongside every screenshot.
pub const EXTRACTION_PROMPT: &str = r#"You are analyzing a screenshot of a subscription list (for example iPhone Settings > Subscriptions, or the Google Play subscriptions page).

Extract ALL subscriptions you see. For each one, identify:
- Service name (e.g. "Netflix", "Spotify Premium", "YouTube Premium")
- Price (numeric only, e.g. 15.99)
- Billing period (either "monthly" or "yearly")

Return ONLY valid JSON in this exact format with no other text:
[
  {"name": "Netflix", "price": 15.99, "period": "monthly"},
  {"name": "Spotify Premium", "price": 9.99, "period": "monthly"}
]

If you see no subscriptions, return: []

Important:
- Extract the ACTUAL price shown (don't guess)
- If billing period is unclear, assume "monthly"
- Ignore free trials unless a price is shown
- Return ONLY the JSON array, no markdown, no explanations"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Fixture,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Fixture => "fixture",
        }
    }
}

/// Bearer token supplied by the user for a single request.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Replaces any occurrence of the token in `text`.
    pub fn scrub(&self, text: &str) -> String {
        let token = self.0.trim();
        if token.is_empty() {
            return text.to_string();
        }
        text.replace(token, "[REDACTED]")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Turns a screenshot into subscription records.
///
/// Implementors only provide the upstream call in [`complete`](Self::complete);
/// credential checks, encoding, and reply parsing are shared by [`extract`](Self::extract).
#[async_trait::async_trait]
pub trait SubscriptionExtractor: Send + Sync {
    fn provider(&self) -> Provider;

    /// Sends one request and returns the raw text completion.
    async fn complete(
        &self,
        image_png_base64: &str,
        credential: &Credential,
    ) -> Result<String, ExtractionError>;

    async fn extract(
        &self,
        screenshot: &Screenshot,
        credential: &Credential,
    ) -> Result<Extraction, ExtractionError> {
        if credential.is_blank() {
            return Err(ExtractionError::MissingCredential);
        }

        let encoded = screenshot.to_png_base64()?;
        tracing::debug!(
            provider = self.provider().as_str(),
            width = screenshot.width(),
            height = screenshot.height(),
            encoded_len = encoded.len(),
            "requesting subscription extraction"
        );

        let text = self.complete(&encoded, credential).await?;
        let extraction = json::parse_subscriptions(&text, self.provider())?;

        tracing::info!(
            provider = self.provider().as_str(),
            records = extraction.records.len(),
            dropped = extraction.dropped,
            coerced_periods = extraction.coerced_periods,
            "subscription extraction finished"
        );
        Ok(extraction)
    }
}

pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn SubscriptionExtractor>> {
    let extractor: Arc<dyn SubscriptionExtractor> = match settings.extractor {
        ExtractorKind::OpenAi => Arc::new(openai::OpenAiVisionClient::from_env()?),
        ExtractorKind::Fixture => Arc::new(fixture::FixtureExtractor::default()),
    };
    Ok(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screenshot::tests::png_bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingExtractor {
        reply: String,
        calls: AtomicUsize,
        last_image: Mutex<Option<String>>,
    }

    impl RecordingExtractor {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                last_image: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl SubscriptionExtractor for RecordingExtractor {
        fn provider(&self) -> Provider {
            Provider::Fixture
        }

        async fn complete(
            &self,
            image_png_base64: &str,
            _credential: &Credential,
        ) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_image.lock().unwrap() = Some(image_png_base64.to_string());
            Ok(self.reply.clone())
        }
    }

    fn screenshot() -> Screenshot {
        Screenshot::from_bytes(&png_bytes(2, 2)).unwrap()
    }

    #[tokio::test]
    async fn blank_credential_short_circuits_without_calling_upstream() {
        let extractor = RecordingExtractor::new("[]");
        for token in ["", "   "] {
            let err = extractor
                .extract(&screenshot(), &Credential::new(token))
                .await
                .unwrap_err();
            assert!(matches!(err, ExtractionError::MissingCredential));
        }
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn extract_sends_png_and_validates_reply() {
        let extractor = RecordingExtractor::new(
            "```json\n[{\"name\": \"Netflix\", \"price\": 15.99, \"period\": \"Monthly\"}, {\"name\": \"Bad\"}]\n```",
        );
        let out = extractor
            .extract(&screenshot(), &Credential::new("sk-test"))
            .await
            .unwrap();

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(extractor.last_image.lock().unwrap().as_deref().unwrap().starts_with("iVBOR"));
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.dropped, 1);
    }

    #[tokio::test]
    async fn malformed_reply_is_reported_not_raised() {
        let extractor = RecordingExtractor::new("Sorry, I can't read that.");
        let err = extractor
            .extract(&screenshot(), &Credential::new("sk-test"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn credential_debug_and_scrub_hide_the_token() {
        let cred = Credential::new("sk-secret-123");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(
            cred.scrub("Incorrect API key provided: sk-secret-123."),
            "Incorrect API key provided: [REDACTED]."
        );
    }
}
