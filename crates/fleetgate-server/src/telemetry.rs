//! Telemetry Ingest: readings submitted by approved devices.

use std::sync::Arc;

use fleetgate_core::db::unix_timestamp;
use tracing::{debug, instrument};

use crate::auth::Caller;
use crate::directory::DeviceDirectory;
use crate::error::{Error, Result};
use crate::storage::{FleetDatabase, Reading};

/// One measurement as submitted by a device.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub value: f64,
    pub name: String,
    pub unit: String,
    /// Unix seconds; ingest time when absent.
    pub timestamp: Option<i64>,
}

impl NewReading {
    fn validate(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(Error::Validation("Value must be a finite number.".into()));
        }
        if self.name.trim().is_empty() || self.unit.trim().is_empty() {
            return Err(Error::Validation("Name and unit must not be empty.".into()));
        }
        Ok(())
    }
}

pub struct TelemetryIngest {
    db: FleetDatabase,
    devices: Arc<DeviceDirectory>,
}

impl TelemetryIngest {
    pub const fn new(db: FleetDatabase, devices: Arc<DeviceDirectory>) -> Self {
        Self { db, devices }
    }

    /// Store a reading for the calling device.
    ///
    /// Only `APPROVED` devices may submit. The data type for the reading's
    /// (name, unit) pair is created on first use.
    #[instrument(skip(self, caller, reading), fields(device_id = caller.subject_id))]
    pub async fn submit(&self, caller: &Caller, reading: NewReading) -> Result<Reading> {
        let device = self.devices.require_approved(caller).await?;
        reading.validate()?;

        let data_type = self
            .db
            .get_or_create_data_type(&reading.name, &reading.unit)
            .await?;
        let timestamp = reading.timestamp.unwrap_or_else(unix_timestamp);

        let stored = self
            .db
            .insert_reading(device.id(), data_type.id, reading.value, timestamp)
            .await?;

        debug!(
            reading_id = stored.id,
            data_type_id = data_type.id,
            "Reading stored"
        );
        Ok(stored)
    }
}
