//! Admin account routes under `/user`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::Message;
use super::extract::{AuthenticatedCaller, HeaderCredentials};
use crate::directory::AdminSession;
use crate::error::Result;
use crate::state::AppState;
use crate::storage::Admin;

/// `POST /user/register`
pub async fn register(
    State(state): State<AppState>,
    HeaderCredentials(credentials): HeaderCredentials,
) -> Result<(StatusCode, Json<Admin>)> {
    let admin = state.admins.register(&credentials).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

/// `GET /user/login`
pub async fn login(
    State(state): State<AppState>,
    HeaderCredentials(credentials): HeaderCredentials,
) -> Result<Json<AdminSession>> {
    state.admins.login(&credentials).await.map(Json)
}

/// `GET /user/logout`
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Message>> {
    state.admins.logout(&caller).await?;
    Ok(Json(Message {
        message: "The user was successfully logged out.",
    }))
}

/// `DELETE /user/delete`
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Message>> {
    state.admins.delete_self(&caller).await?;
    Ok(Json(Message {
        message: "The user was successfully deleted.",
    }))
}
