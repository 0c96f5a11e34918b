//! Admin device listings.

use axum::Json;
use axum::extract::State;

use super::extract::AuthenticatedCaller;
use crate::error::Result;
use crate::state::AppState;
use crate::storage::Device;

/// `GET /devices/all`
pub async fn all(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Vec<Device>>> {
    state.devices.list_all(caller.subject_id).await.map(Json)
}

/// `GET /devices/requests`
pub async fn requests(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<Vec<Device>>> {
    state.devices.list_pending(caller.subject_id).await.map(Json)
}
