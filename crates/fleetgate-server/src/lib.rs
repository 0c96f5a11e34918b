//! `FleetGate` Server Library
//!
//! Core functionality for the `FleetGate` IoT backend:
//! - SQLite storage for accounts, devices, readings and revoked tokens
//! - JWT issuance with an always-checked revocation blocklist
//! - Device lifecycle (registration, approval, blacklisting, soft delete)
//! - Telemetry ingest for approved devices
//! - REST surface over axum

pub mod auth;
pub mod directory;
pub mod error;
pub mod http;
pub mod state;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod test_helpers;

pub use error::{Error, Result};
pub use state::AppState;
