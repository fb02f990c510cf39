//! HTTP trigger
//!
//! - `POST /crawl` records a run and processes it in a background task
//! - `OPTIONS /crawl` answers plain preflight probes
//! - `GET /runs/:id` reports the stored state of a run

use crate::config::ServerConfig;
use crate::pipeline::{execute_run, start_run, RunSettings, Services};
use crate::storage::{lock_storage, RunStore};
use crate::url::normalize_url;
use crate::PomforgeError;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const CRAWL_STARTED: &str = "Crawling and test generation started";
pub const OPTIONS_ACCEPTED: &str = "OPTIONS request accepted";

/// Handles every request shares
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub settings: RunSettings,
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlAccepted {
    pub message: &'static str,
    pub url: String,
    pub run_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Builds the router with CORS and request tracing
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/crawl", post(start_crawl).options(crawl_options))
        .route("/runs/:id", get(run_status))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Binds `config.bind` and serves until the process exits
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), PomforgeError> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("Listening on http://{}", config.bind);
    axum::serve(listener, router(state, config))
        .await
        .map_err(|e| PomforgeError::Server(e.to_string()))
}

async fn start_crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Response {
    if let Err(e) = normalize_url(&request.url) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let run_id = match start_run(&state.services, &request.url) {
        Ok(run_id) => run_id,
        Err(e) => {
            tracing::error!("Could not create run for {}: {}", request.url, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to start run");
        }
    };

    let url = request.url.clone();
    let background_id = run_id.clone();
    tokio::spawn(async move {
        // failures are already recorded on the run
        let _ = execute_run(&state.services, &state.settings, &background_id, &url).await;
    });

    (
        StatusCode::ACCEPTED,
        Json(CrawlAccepted {
            message: CRAWL_STARTED,
            url: request.url,
            run_id,
        }),
    )
        .into_response()
}

async fn crawl_options() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: OPTIONS_ACCEPTED,
    })
}

async fn run_status(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    match lock_storage(&state.services.storage).and_then(|store| store.get_run(&run_id)) {
        Ok(Some(run)) => Json(run).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Run not found"),
        Err(e) => {
            tracing::error!("Failed to read run {}: {}", run_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read run")
        }
    }
}
