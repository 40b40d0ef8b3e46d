use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use snip_core::aggregate::{summarize, CostSummary};
use snip_core::display::format_currency;
use snip_core::domain::subscription::{BillingPeriod, SubscriptionRecord};
use snip_core::llm::error::ExtractionError;
use snip_core::llm::{Credential, SubscriptionExtractor};
use snip_core::screenshot::{Screenshot, ScreenshotError};

const IMAGE_FIELD: &str = "image";

static SCREENSHOT_TIPS: [&str; 3] = [
    "Make sure the screenshot clearly shows subscription names and prices",
    "Try the iPhone Subscriptions page: Settings > [Your Name] > Subscriptions",
    "Ensure text is readable (not blurry or too small)",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = snip_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let extractor = snip_core::llm::from_settings(&settings).inspect_err(|e| {
        sentry_anyhow::capture_anyhow(e);
        tracing::error!(error = %e, "failed to build extractor");
    })?;
    tracing::info!(provider = extractor.provider().as_str(), "extractor ready");

    let app = router(AppState { extractor }, settings.max_upload_bytes);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/extract", post(extract_subscriptions))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    extractor: Arc<dyn SubscriptionExtractor>,
}

#[derive(Debug, Serialize)]
struct ApiSubscription {
    name: String,
    price: f64,
    period: BillingPeriod,
    yearly_cost: f64,
    formatted_price: String,
}

impl From<SubscriptionRecord> for ApiSubscription {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            yearly_cost: record.yearly_cost(),
            formatted_price: format_currency(record.price),
            name: record.name,
            price: record.price,
            period: record.period,
        }
    }
}

#[derive(Debug, Serialize)]
struct FormattedSummary {
    yearly_total: String,
    monthly_average: String,
    daily_average: String,
}

impl From<&CostSummary> for FormattedSummary {
    fn from(s: &CostSummary) -> Self {
        Self {
            yearly_total: format_currency(s.yearly_total),
            monthly_average: format_currency(s.monthly_average),
            daily_average: format_currency(s.daily_average),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExtractResponse {
    request_id: Uuid,
    processed_at: DateTime<Utc>,
    provider: &'static str,
    subscriptions: Vec<ApiSubscription>,
    dropped: usize,
    coerced_periods: usize,
    no_records_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<CostSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted_summary: Option<FormattedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tips: Option<&'static [&'static str]>,
}

async fn extract_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let credential = bearer_credential(&headers);

    let bytes = read_image_field(multipart).await?;
    let screenshot = Screenshot::from_bytes(&bytes)?;

    let extraction = state
        .extractor
        .extract(&screenshot, &credential)
        .await
        .inspect_err(|e| {
            if matches!(e, ExtractionError::TransportFailure { .. }) {
                sentry::capture_error(e);
            }
            tracing::warn!(%request_id, kind = e.kind(), error = %e, "extraction failed");
        })?;

    let no_records_found = extraction.is_empty();
    let summary = (!no_records_found).then(|| summarize(&extraction.records));

    tracing::info!(
        %request_id,
        records = extraction.records.len(),
        dropped = extraction.dropped,
        "extraction served"
    );

    Ok(Json(ExtractResponse {
        request_id,
        processed_at: Utc::now(),
        provider: state.extractor.provider().as_str(),
        dropped: extraction.dropped,
        coerced_periods: extraction.coerced_periods,
        subscriptions: extraction.records.into_iter().map(ApiSubscription::from).collect(),
        no_records_found,
        formatted_summary: summary.as_ref().map(FormattedSummary::from),
        summary,
        tips: no_records_found.then_some(&SCREENSHOT_TIPS[..]),
    }))
}

/// Reads `Authorization: Bearer <token>`. A missing or unparsable header yields a
/// blank credential, which the extractor rejects before any network call.
fn bearer_credential(headers: &HeaderMap) -> Credential {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token)
        .unwrap_or_default();
    Credential::new(token.trim())
}

async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::BadRequest(format!(
        "multipart field `{IMAGE_FIELD}` is required"
    )))
}

#[derive(Debug)]
enum ApiError {
    Extraction(ExtractionError),
    InvalidImage(ScreenshotError),
    BadRequest(String),
}

impl From<ExtractionError> for ApiError {
    fn from(e: ExtractionError) -> Self {
        Self::Extraction(e)
    }
}

impl From<ScreenshotError> for ApiError {
    fn from(e: ScreenshotError) -> Self {
        Self::InvalidImage(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    hint: &'static str,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, &'static str) {
        match self {
            Self::Extraction(e @ ExtractionError::MissingCredential) => (
                StatusCode::UNAUTHORIZED,
                e.kind(),
                "Please provide your OpenAI API key.".to_string(),
                "Send it as `Authorization: Bearer <key>`. It is used for this request only and never stored.",
            ),
            Self::Extraction(e @ ExtractionError::AuthenticationFailure { .. }) => (
                StatusCode::UNAUTHORIZED,
                e.kind(),
                "The vision service rejected your API key.".to_string(),
                "Check that your API key is correct and that billing is set up at platform.openai.com.",
            ),
            Self::Extraction(e @ ExtractionError::TransportFailure { message, .. }) => (
                StatusCode::BAD_GATEWAY,
                e.kind(),
                format!("The vision service request failed: {message}"),
                "Check your API key and account status (billing, quota), then try again.",
            ),
            Self::Extraction(e @ ExtractionError::MalformedResponse { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                e.kind(),
                "The AI returned data we couldn't read.".to_string(),
                "Try a clearer screenshot.",
            ),
            Self::Extraction(e @ ExtractionError::ImageEncoding(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.kind(),
                "The screenshot could not be prepared for analysis.".to_string(),
                "Try re-saving the screenshot as PNG and upload it again.",
            ),
            Self::InvalidImage(e) => (
                StatusCode::BAD_REQUEST,
                "invalid_image",
                e.to_string(),
                "Upload a PNG or JPEG screenshot.",
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                message.clone(),
                "Send a multipart form with the screenshot in the `image` field.",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, hint) = self.parts();
        (status, Json(ErrorBody { error, message, hint })).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &snip_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
