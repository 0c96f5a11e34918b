//! `FleetGate` Core Library
//!
//! Shared plumbing for `FleetGate` components:
//! - `SQLite` pool setup, migrations macro and database errors
//! - Layered server configuration
//! - Tracing subscriber initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::ServerConfig;
pub use error::{Error, Result};
