//! API handlers for the HTTP REST API

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::auth::IdentityVerifier;
use crate::error::Error;
use crate::models::UrlListing;
use crate::registry::UrlRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Owner-scoped URL operations
    pub registry: Arc<UrlRegistry>,
    /// Resolves the `Authorization` header to an owner
    pub verifier: Arc<dyn IdentityVerifier>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Body of add/remove requests
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: String,
}

/// URL list returned by add/remove
#[derive(Debug, Serialize)]
pub struct UrlsResponse {
    pub urls: Vec<String>,
}

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Domain error rendered as an HTTP response
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Store(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Resolve the caller's identity from the `Authorization` header
async fn owner(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .unwrap_or_default();

    Ok(state.verifier.verify(token).await?)
}

/// List the caller's URLs and status
pub async fn get_urls(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UrlListing>, ApiError> {
    let owner = owner(&state, &headers).await?;
    Ok(Json(state.registry.get_urls(&owner).await?))
}

/// Start monitoring a URL
pub async fn add_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UrlRequest>,
) -> Result<Json<UrlsResponse>, ApiError> {
    let owner = owner(&state, &headers).await?;
    let urls = state.registry.add_url(&owner, &req.url).await?;
    Ok(Json(UrlsResponse { urls }))
}

/// Stop monitoring a URL
pub async fn remove_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UrlRequest>,
) -> Result<Json<UrlsResponse>, ApiError> {
    let owner = owner(&state, &headers).await?;
    let urls = state.registry.remove_url(&owner, &req.url).await?;
    Ok(Json(UrlsResponse { urls }))
}
