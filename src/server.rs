use crate::config::Config;
use crate::engine::OcrEngine;
use crate::engines;
use crate::error::OcrError;
use crate::ocr::{OcrProcessor, RecognitionResult};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Upload extensions accepted by `/upload`
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<OcrProcessor>,
    pub config: Arc<Config>,
}

/// Upload response
#[derive(Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub result: RecognitionResult,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct EngineInfoResponse {
    pub name: String,
    pub description: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: EngineInfoResponse,
    pub available_engines: Vec<String>,
    pub languages: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: usize,
    pub translation_enabled: bool,
    pub translation_target: String,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let processor = OcrProcessor::new(&config)?;
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(AppState {
        processor: Arc::new(processor),
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    // Multipart framing on top of the file itself
    let body_limit = state.config.max_file_size + 64 * 1024;

    Router::new()
        .route("/", get(handle_index))
        .route("/upload", post(handle_upload))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Lowercased extension of an uploaded file name, if it is one we accept
fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

/// Body-limit rejections keep their 413; anything else is a malformed request
fn multipart_error(err: MultipartError, context: &str, max_file_size: usize) -> OcrError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::UploadTooLarge { max: max_file_size }
    } else {
        OcrError::InvalidRequest(format!("{}: {}", context, err))
    }
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Handle image uploads
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, OcrError> {
    let start = Instant::now();
    let max_file_size = state.config.max_file_size;

    let mut file: Option<(String, Bytes)> = None;
    let mut translate = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart", max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, "Failed to read file data", max_file_size))?;
                file = Some((filename, data));
            }
            "translate" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, "Invalid translate flag", max_file_size))?;
                translate = parse_flag(&value);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (filename, data) = file.ok_or(OcrError::MissingFile("No file part"))?;
    if filename.is_empty() {
        return Err(OcrError::MissingFile("No file selected"));
    }

    let extension =
        allowed_extension(&filename).ok_or_else(|| OcrError::UnsupportedFormat(filename.clone()))?;

    if data.len() > max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: max_file_size,
        });
    }

    // The client's file name never touches the filesystem; only its extension does
    let mut temp_file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", extension))
        .tempfile()
        .map_err(|e| OcrError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp_file
        .write_all(&data)
        .map_err(|e| OcrError::Internal(format!("Failed to write temp file: {}", e)))?;

    tracing::info!(
        "Received {} ({} bytes, translate: {})",
        filename,
        data.len(),
        translate
    );

    let processor = Arc::clone(&state.processor);
    let result = tokio::task::spawn_blocking(move || {
        let result = processor.process(temp_file.path(), translate);
        drop(temp_file);
        result
    })
    .await
    .map_err(|e| OcrError::Internal(format!("OCR task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    Ok(Json(UploadResponse {
        result,
        processing_time_ms,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let engine: &dyn OcrEngine = state.processor.engine();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: EngineInfoResponse {
            name: engine.name().to_string(),
            description: engine.description().to_string(),
        },
        available_engines: engines::available()
            .iter()
            .map(|e| format!("{}: {}", e.name, e.description))
            .collect(),
        languages: engine.languages(),
        allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        max_file_size_bytes: state.config.max_file_size,
        translation_enabled: state.config.translation.enabled,
        translation_target: state.processor.target_language().to_string(),
    })
}
