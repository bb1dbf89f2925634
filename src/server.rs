//! HTTP server.
//!
//! Exposes the assessment pipeline as a JSON HTTP API for frontend clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/analyze` | Multipart image upload → `{"analysis": {...}}` |
//! | `GET`  | `/history` | All stored analyses, most recent first |
//! | `GET`  | `/uploads/{name}` | Stored upload images |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Failures of the analyze operation itself never produce an HTTP error:
//! the response keeps its `{"analysis": ...}` shape and the inner payload
//! carries an `error` string clients must check for. Only malformed
//! requests (bad multipart, missing `file` field) and history storage
//! failures surface as HTTP error responses:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "multipart field 'file' is required" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! frontends.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::analyze::{analyze_contained, AnalysisResponse};
use crate::config::Config;
use crate::db;
use crate::models::AnalysisRecord;
use crate::store;
use crate::vision::{self, ModelClient};

/// Uploads larger than this are rejected before reaching the pipeline.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    /// Application configuration (wrapped in `Arc` for cheap cloning across handlers).
    config: Arc<Config>,
    /// Connection pool shared by concurrent requests.
    pool: SqlitePool,
    /// The configured vision model client.
    model: Arc<dyn ModelClient>,
}

/// Starts the HTTP server with the provider named in the configuration.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated. This is the standard entry point used by the
/// `claimsight serve` command; tests inject a fake model via
/// [`run_server_with_client`].
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let client = vision::create_client(&config.model)?;
    run_server_with_client(config, client).await
}

/// Starts the HTTP server with an explicit model client.
pub async fn run_server_with_client(
    config: &Config,
    model: Arc<dyn ModelClient>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        model,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/history", get(handle_history))
        .route("/health", get(handle_health))
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    println!("claimsight server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body for request-level failures.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for storage failures.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /analyze ============

/// Handler for `POST /analyze`.
///
/// Reads the `file` field from the multipart body and runs the assessment
/// pipeline on it. The response is always `200` with an `{"analysis": ...}`
/// body; pipeline failures appear inside it as an `error` string.
async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.png").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| bad_request("multipart field 'file' is required"))?;

    tracing::info!(file = %filename, size = bytes.len(), "analyze request");

    let response = analyze_contained(
        &state.pool,
        &state.config,
        state.model.as_ref(),
        &bytes,
        &filename,
    )
    .await;

    Ok(Json(response))
}

// ============ GET /history ============

/// Handler for `GET /history`.
///
/// Returns all stored analyses as a JSON array, most recently created
/// first, with ISO-8601 timestamps.
async fn handle_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnalysisRecord>>, AppError> {
    let records = store::list_records(&state.pool)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?;

    Ok(Json(records))
}
