//! REST surface: axum router, extractors and route handlers.

mod auth;
mod data;
mod devices;
mod error;
mod extract;
mod user;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use extract::{AuthenticatedCaller, HeaderCredentials, JsonBody};

use crate::state::AppState;

/// Plain `{"message": ...}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Build the application router over the given services.
pub fn build_router(state: AppState, max_payload_bytes: usize) -> Router {
    let device_routes = Router::new()
        .route("/auth/login/{id}", get(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/status", get(auth::status))
        .route("/auth/update", patch(auth::update))
        .route("/auth/delete/{id}", delete(auth::delete))
        .route("/devices/all", get(devices::all))
        .route("/devices/requests", get(devices::requests))
        .route("/data", post(data::submit));

    let admin_routes = Router::new()
        .route("/user/register", post(user::register))
        .route("/user/login", get(user::login))
        .route("/user/logout", get(user::logout))
        .route("/user/delete", delete(user::delete));

    Router::new()
        .merge(device_routes)
        .merge(admin_routes)
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_payload_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
