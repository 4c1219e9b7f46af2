//! REST API endpoints.
//!
//! Axum-based HTTP API serving season leaderboards, cross-season user
//! search, typeahead suggestions and scraper control.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Log the underlying error and keep only a generic message for the client.
    pub fn internal(message: &str, err: impl std::fmt::Display) -> Self {
        error!("{}: {}", message, err);
        ApiError::Internal(message.to_string())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origin == "*" {
        return layer.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/api/health", get(routes::health::health))
        .route(
            "/api/leaderboard/:season",
            get(routes::leaderboard::get_leaderboard),
        )
        .route("/api/search/:username", get(routes::search::search))
        .route(
            "/api/suggestions/:query",
            get(routes::suggestions::suggestions),
        )
        .route("/api/refresh", post(routes::scraper::trigger))
        .route("/api/scraper/trigger", post(routes::scraper::trigger))
        .route("/api/scraper/status", get(routes::scraper::status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
