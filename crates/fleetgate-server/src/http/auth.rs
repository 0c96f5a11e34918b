//! Device routes under `/auth`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::extract::{AuthenticatedCaller, HeaderCredentials, JsonBody};
use crate::directory::{DeviceSession, StatusReport};
use crate::error::Result;
use crate::state::AppState;
use crate::storage::Device;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub serial_number: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateBody {
    pub status: String,
    pub device_id: i64,
}

/// `GET /auth/login/{id}`
pub async fn login(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    HeaderCredentials(credentials): HeaderCredentials,
) -> Result<Json<DeviceSession>> {
    state.devices.login(id, &credentials).await.map(Json)
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    HeaderCredentials(credentials): HeaderCredentials,
    JsonBody(body): JsonBody<RegisterBody>,
) -> Result<(StatusCode, Json<DeviceSession>)> {
    let session = state
        .devices
        .register(&credentials, &body.serial_number)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /auth/status`
pub async fn status(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<StatusReport>> {
    state.devices.check_status(&caller).await.map(Json)
}

/// `PATCH /auth/update`
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    JsonBody(body): JsonBody<StatusUpdateBody>,
) -> Result<Json<Device>> {
    state
        .devices
        .update_status(caller.subject_id, body.device_id, &body.status)
        .await
        .map(Json)
}

/// `DELETE /auth/delete/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    HeaderCredentials(credentials): HeaderCredentials,
) -> Result<Json<Device>> {
    state.devices.delete(id, &credentials).await.map(Json)
}
