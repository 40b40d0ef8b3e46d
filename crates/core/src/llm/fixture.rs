use crate::llm::error::ExtractionError;
use crate::llm::{Credential, Provider, SubscriptionExtractor};

/// Canned reply in the shape a vision model tends to produce, fences included.
pub const DEMO_REPLY: &str = r#"```json
[
  {"name": "Netflix", "price": 15.99, "period": "monthly"},
  {"name": "Spotify Premium", "price": 9.99, "period": "monthly"},
  {"name": "Duolingo Super", "price": 83.99, "period": "yearly"}
]
```"#;

/// Deterministic extractor that never leaves the process. Used for demos and tests;
/// the reply still goes through the same parsing path as a live one.
#[derive(Debug, Clone)]
pub struct FixtureExtractor {
    reply: String,
}

impl FixtureExtractor {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for FixtureExtractor {
    fn default() -> Self {
        Self::with_reply(DEMO_REPLY)
    }
}

#[async_trait::async_trait]
impl SubscriptionExtractor for FixtureExtractor {
    fn provider(&self) -> Provider {
        Provider::Fixture
    }

    async fn complete(
        &self,
        _image_png_base64: &str,
        _credential: &Credential,
    ) -> Result<String, ExtractionError> {
        Ok(self.reply.clone())
    }
}
