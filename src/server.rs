//! HTTP surface: the classify endpoint and its router.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ClassifyError;
use crate::extract::{self, FileKind};
use crate::llm::EmailClassifier;
use crate::normalize::TextNormalizer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Classification backend, injected so tests can stub it.
    pub classifier: Arc<dyn EmailClassifier>,
    /// Shared normalizer; loads its language resources once at startup.
    pub normalizer: Arc<TextNormalizer>,
}

/// Build the Axum router for the classification service.
pub fn classify_routes(
    classifier: Arc<dyn EmailClassifier>,
    normalizer: Arc<TextNormalizer>,
    config: &ServerConfig,
) -> Router {
    let state = AppState {
        classifier,
        normalizer,
    };

    Router::new()
        .route("/classify", post(classify))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer(&config.allowed_origins))
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inbox-triage"
    }))
}

// ── Classify ────────────────────────────────────────────────────────

/// Uploaded file field: the client-declared name plus the raw bytes.
struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

/// The fields we accept from the multipart form.
#[derive(Default)]
struct ClassifyForm {
    text: Option<String>,
    file: Option<UploadedFile>,
}

/// Collect the `text` and `file` fields; unknown fields are drained and
/// ignored.
///
/// The multipart parser reports a zero-part body as an error before any
/// field is yielded; that case is an empty form (the caller answers it
/// with the no-input payload), not a malformed request.
async fn read_form(mut multipart: Multipart) -> Result<ClassifyForm, MultipartError> {
    let mut form = ClassifyForm::default();
    let mut saw_field = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) if !saw_field => break,
            Err(e) => return Err(e),
        };
        saw_field = true;

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = Some(field.text().await?),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile { filename, bytes });
            }
            _ => {
                field.bytes().await?;
            }
        }
    }

    Ok(form)
}

async fn classify(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4();
    handle_classify(state, multipart)
        .instrument(info_span!("classify", request_id = %request_id))
        .await
}

/// Run one classification request end to end.
///
/// Input selection order: non-empty `text` wins, then an uploaded file,
/// else the request is answered with the fixed no-input payload (status
/// 200, which the frontend contract relies on). File input is spooled to
/// a uniquely named temp file that is deleted on every exit path.
async fn handle_classify(state: AppState, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "Rejected malformed multipart body");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Requisição multipart inválida."})),
            )
                .into_response();
        }
    };

    let email_text = if let Some(text) = form.text.filter(|t| !t.is_empty()) {
        debug!(chars = text.len(), "Classifying inline text");
        text
    } else if let Some(file) = form.file {
        let spooled = match extract::spool_to_temp(&file.bytes) {
            Ok(spooled) => spooled,
            Err(e) => {
                error!(error = %e, "Failed to spool upload to temp file");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "Falha ao processar o arquivo enviado."})),
                )
                    .into_response();
            }
        };

        let kind = FileKind::from_filename(&file.filename);
        debug!(filename = %file.filename, kind = ?kind, "Extracting uploaded file");

        match extract::extract_text(spooled.path(), kind).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, filename = %file.filename, "Could not extract text from upload");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": "Não foi possível ler o arquivo enviado."})),
                )
                    .into_response();
            }
        }
        // `spooled` drops here and removes the temp file.
    } else {
        info!("Request carried no text and no file");
        return (
            StatusCode::OK,
            Json(serde_json::json!({"error": "Nenhum texto ou arquivo enviado."})),
        )
            .into_response();
    };

    let normalized = state.normalizer.normalize(&email_text);
    debug!(
        raw_chars = email_text.len(),
        normalized_chars = normalized.len(),
        "Email text normalized"
    );

    match state.classifier.classify(&normalized).await {
        Ok(result) => {
            info!(category = result.category.as_str(), "Email classified");
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(ClassifyError::MalformedResponse { raw }) => {
            warn!("Returning raw AI payload after parse failure");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "Falha ao interpretar a resposta da AI. Pode ser limite de uso ou resposta inesperada.",
                    "raw_ai_response": raw,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Classification request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Falha ao consultar o serviço de classificação."})),
            )
                .into_response()
        }
    }
}
