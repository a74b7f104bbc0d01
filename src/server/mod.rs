//! Authenticated read API over the filtered dataset
//!
//! The dataset and the credential allow-list are loaded once at start-up
//! and shared with every handler through [`AppState`].

mod auth;
mod routes;

pub use auth::{parse_basic_auth, AuthenticatedUser, Credentials};
pub use routes::create_router;

use crate::config::ServerConfig;
use crate::models::UserRecord;
use crate::HarvestError;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Filtered dataset, in file order
    pub users: Arc<Vec<UserRecord>>,

    /// Accepted Basic credentials
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(users: Vec<UserRecord>, credentials: Credentials) -> Self {
        Self {
            users: Arc::new(users),
            credentials: Arc::new(credentials),
        }
    }
}

/// Errors returned by the read API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or wrong credentials
    Unauthorized,
    /// No user with the requested login
    NotFound,
    /// Query parameters failed validation
    InvalidQuery(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, "Basic")],
                Json(json!({ "detail": "Incorrect username or password" })),
            )
                .into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "User not found" })),
            )
                .into_response(),
            Self::InvalidQuery(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": message })),
            )
                .into_response(),
        }
    }
}

/// Builds the router with request tracing
pub fn build_router(state: AppState) -> Router {
    create_router(state).layer(TraceLayer::new_for_http())
}

/// Serves the read API until Ctrl-C
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), HarvestError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|e| HarvestError::Server(format!("Invalid bind address: {}", e)))?;

    if state.credentials.is_empty() {
        tracing::warn!("No authorized users configured; every request will be rejected");
    }

    tracing::info!(
        %addr,
        users = state.users.len(),
        credentials = state.credentials.len(),
        "Starting read API"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Read API shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
