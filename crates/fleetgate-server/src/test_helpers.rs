//! Shared test helpers for service test modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use crate::auth::{Argon2Verifier, Caller, JwtManager, TokenPolicy};
use crate::directory::Credentials;
use crate::state::AppState;
use crate::storage::{Device, FleetDatabase};

pub const TEST_POLICY: TokenPolicy = TokenPolicy {
    device_ttl_secs: 365 * 24 * 3600,
    admin_ttl_secs: 1800,
};

/// Services over a fresh in-memory database, with cheap password hashing.
pub async fn setup() -> (AppState, FleetDatabase) {
    let db = FleetDatabase::open_in_memory().await.unwrap();
    let credentials = Arc::new(Argon2Verifier::with_params(8, 1, 1).unwrap());
    let state = AppState::new(
        db.clone(),
        JwtManager::new(b"test-secret"),
        TEST_POLICY,
        credentials,
    );
    (state, db)
}

pub fn creds(username: &str) -> Credentials {
    Credentials::new(username, "password123")
}

/// Register an admin and return the caller identity of a fresh session.
pub async fn admin_caller(state: &AppState, username: &str) -> Caller {
    state.admins.register(&creds(username)).await.unwrap();
    let session = state.admins.login(&creds(username)).await.unwrap();
    state.tokens.verify(&session.access_token).await.unwrap()
}

/// Register a device and return it with the caller identity of its token.
pub async fn device_caller(state: &AppState, username: &str, serial: &str) -> (Device, Caller) {
    let session = state
        .devices
        .register(&creds(username), serial)
        .await
        .unwrap();
    let caller = state.tokens.verify(&session.access_token).await.unwrap();
    (session.device, caller)
}
