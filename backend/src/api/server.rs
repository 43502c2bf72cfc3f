//! HTTP Server for the tabclean API.
//!
//! Provides REST endpoints for uploading tables, running the transform
//! pipeline and downloading exports.
//!
//! # API Endpoints
//!
//! | Method | Path            | Description                                 |
//! |--------|-----------------|---------------------------------------------|
//! | GET    | `/health`       | Health check                                |
//! | POST   | `/api/process`  | Upload files, run operations, get reports   |
//! | POST   | `/api/export`   | Upload one file, run operations, download   |
//! | GET    | `/api/logs`     | SSE stream for real-time logs               |
//!
//! Both POST endpoints take `multipart/form-data` with one or more `file`
//! fields, an optional `operations` field (JSON array, see
//! [`crate::transform::operations_description`]), an optional `previewRows`
//! and, for export, a `format` of `csv` or `xlsx`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, ProcessResponse};
use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use crate::export::ExportFormat;
use crate::transform::{process_batch, process_file, InputFile, Operation, PipelineOptions};

/// Build the router. Split from [`start_server`] so it can be mounted elsewhere.
pub fn router(config: AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = config.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/process", post(process_upload))
        .route("/api/export", post(export_upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(config)
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 tabclean server running on http://localhost:{}", config.port);
    println!("   POST /api/process - Upload and process files");
    println!("   POST /api/export  - Upload, process and download");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(config)).await?;

    Ok(())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        eprintln!("❌ {}", self);
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tabclean",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "process": "POST /api/process",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Fields collected from a multipart upload.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<InputFile>,
    operations: Vec<Operation>,
    preview_rows: Option<usize>,
    format: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> ServerResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                form.files.push(InputFile::new(file_name, bytes.to_vec()));
            }
            "operations" => {
                let text = field_text(field).await?;
                if !text.trim().is_empty() {
                    form.operations = serde_json::from_str(&text).map_err(|e| {
                        ServerError::BadRequest(format!("Invalid operations: {}", e))
                    })?;
                }
            }
            "previewRows" => {
                let text = field_text(field).await?;
                let rows = text.trim().parse().map_err(|_| {
                    ServerError::BadRequest(format!("Invalid previewRows: {}", text))
                })?;
                form.preview_rows = Some(rows);
            }
            "format" => form.format = Some(field_text(field).await?),
            _ => {}
        }
    }

    if form.files.is_empty() {
        return Err(ServerError::BadRequest("No file provided".into()));
    }
    Ok(form)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> ServerResult<String> {
    field
        .text()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))
}

/// Upload one or more files and get a report per file.
async fn process_upload(
    State(config): State<AppConfig>,
    multipart: Multipart,
) -> ServerResult<Json<ProcessResponse>> {
    let form = read_form(multipart).await?;
    log_info(format!("📄 NEW UPLOAD: {} file(s)", form.files.len()));

    let options = PipelineOptions {
        operations: form.operations,
        preview_rows: form.preview_rows.unwrap_or(config.preview_rows),
        export: None,
    };
    let files = form.files;

    let report = tokio::task::spawn_blocking(move || process_batch(&files, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(Json(ProcessResponse::from(&report)))
}

/// Upload one file, run operations, and download the export.
async fn export_upload(
    State(config): State<AppConfig>,
    multipart: Multipart,
) -> ServerResult<Response> {
    let form = read_form(multipart).await?;
    let format: ExportFormat = form.format.as_deref().unwrap_or("csv").parse()?;
    let file = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    let options = PipelineOptions {
        operations: form.operations,
        preview_rows: config.preview_rows,
        export: Some(format),
    };

    let outcome = tokio::task::spawn_blocking(move || process_file(&file.name, &file.bytes, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    let artifact = outcome
        .export
        .ok_or_else(|| ServerError::Internal("export was not produced".into()))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(&artifact.file_name)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// Keep a file name safe inside a quoted header parameter.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my \"data\".csv"), "my _data_.csv");
        assert_eq!(sanitize_file_name("ok.xlsx"), "ok.xlsx");
    }

    #[test]
    fn test_error_status_codes() {
        let resp = ServerError::BadRequest("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ServerError::Internal("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
