use crate::llm::Provider;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("credential is missing")]
    MissingCredential,

    #[error("{provider:?} rejected the credential: {message}")]
    AuthenticationFailure { provider: Provider, message: String },

    #[error("{provider:?} request failed (status={status:?}): {message}")]
    TransportFailure {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider:?} reply is not a JSON array of subscriptions: {detail}")]
    MalformedResponse {
        provider: Provider,
        detail: String,
        raw_output: Option<String>,
    },

    #[error("failed to encode screenshot: {0}")]
    ImageEncoding(#[from] image::ImageError),
}

impl ExtractionError {
    /// Stable snake_case identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::AuthenticationFailure { .. } => "authentication_failure",
            Self::TransportFailure { .. } => "transport_failure",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::ImageEncoding(_) => "image_encoding",
        }
    }
}
