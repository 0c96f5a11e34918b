//! SQLite database handle for the `FleetGate` server.

pub use fleetgate_core::db::DatabaseError;

fleetgate_core::define_database!(FleetDatabase, "Fleet database migrations complete");
