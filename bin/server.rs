// Fino Split - Web Server
// Upload three workbooks, download the split report

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use anyhow::Context;
use clap::Parser;
use fino_split::{PipelineConfig, ReportRequest, SchemaError, VERSION};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Finance exports are small, but well past axum's 2 MB default
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const UPLOAD_FIELDS: [&str; 3] = ["transactions", "branch_map", "employee_map"];

#[derive(Parser, Debug)]
#[command(name = "fino-split-server")]
#[command(about = "Splits transaction exports into per-state revenue sheets")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// JSON file overriding sheet layouts, column names and fee rates
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    config: Arc<PipelineConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
enum ApiError {
    #[error("Missing upload: {field}")]
    MissingUpload { field: &'static str },

    #[error("Invalid upload: {details}")]
    InvalidUpload { details: String },

    /// Pipeline refused the inputs (missing sheet, header or column)
    #[error("{0:#}")]
    Unprocessable(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUpload { .. } | ApiError::InvalidUpload { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "Report request failed");
        (status, Json(ApiResponse::failed(self.to_string()))).into_response()
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - Upload form
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        version: VERSION,
    }))
}

/// POST /api/report - Multipart upload of the three workbooks
async fn create_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let request = read_uploads(multipart).await?;
    let config = state.config.clone();

    let artifact = tokio::task::spawn_blocking(move || request.process(&config))
        .await
        .map_err(|e| ApiError::Internal(format!("Report task failed: {}", e)))?
        .map_err(|e| {
            if e.downcast_ref::<SchemaError>().is_some() {
                ApiError::Unprocessable(e)
            } else {
                ApiError::Internal(format!("{:#}", e))
            }
        })?;

    info!(
        bytes = artifact.bytes.len(),
        partitions = artifact.stats.partitions,
        unresolved = artifact.stats.resolution.unresolved,
        "Report served"
    );

    let disposition = format!("attachment; filename=\"{}\"", artifact.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// Collect the three named file fields; unknown fields are ignored
async fn read_uploads(mut multipart: Multipart) -> Result<ReportRequest, ApiError> {
    let mut uploads: [Option<Vec<u8>>; 3] = [None, None, None];

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidUpload { details: e.to_string() })?
    {
        let slot = match field.name().and_then(|name| UPLOAD_FIELDS.iter().position(|f| *f == name)) {
            Some(slot) => slot,
            None => continue,
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidUpload { details: e.to_string() })?;
        uploads[slot] = Some(bytes.to_vec());
    }

    let [transactions, branch_map, employee_map] = uploads;
    Ok(ReportRequest {
        transactions: required(transactions, UPLOAD_FIELDS[0])?,
        branch_map: required(branch_map, UPLOAD_FIELDS[1])?,
        employee_map: required(employee_map, UPLOAD_FIELDS[2])?,
    })
}

fn required(upload: Option<Vec<u8>>, field: &'static str) -> Result<Vec<u8>, ApiError> {
    match upload {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(ApiError::MissingUpload { field }),
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/report", post(create_report))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fino_split=info,fino_split_server=info,tower_http=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    println!("🌐 Fino Split - Web Server v{}", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = match &args.config {
        Some(path) => {
            let config = PipelineConfig::from_json_file(path)?;
            println!("✓ Config loaded: {:?}", path);
            config
        }
        None => PipelineConfig::default(),
    };

    let state = AppState {
        config: Arc::new(config),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;

    println!("\n🚀 Server running on http://{}", args.bind);
    println!("   API: POST /api/report");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
