//! SQLite storage for the `FleetGate` server.
//!
//! Provides persistence for accounts (admins and devices), data types,
//! readings and the revoked-token blocklist.

mod db;
mod models;
mod queries;
mod queries_blocklist;
mod queries_telemetry;


pub use db::{DatabaseError, FleetDatabase};
pub use models::*;
pub use queries::DeviceRegistration;
