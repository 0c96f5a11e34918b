//! Data type and reading queries.

use super::db::{DatabaseError, FleetDatabase};
use super::models::{DataType, Reading};

impl FleetDatabase {
    // =========================================================================
    // Data type queries
    // =========================================================================

    /// Fetch the data type for `(name, unit)`, creating it on first use.
    ///
    /// Two callers racing on a new pair both end up with the same row: the
    /// losing insert is dropped by the unique constraint and the follow-up
    /// select sees the winner.
    pub async fn get_or_create_data_type(
        &self,
        name: &str,
        unit: &str,
    ) -> Result<DataType, DatabaseError> {
        sqlx::query("INSERT INTO data_types (name, unit) VALUES (?, ?) ON CONFLICT(name, unit) DO NOTHING")
            .bind(name)
            .bind(unit)
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, DataType>(
            "SELECT id, name, unit FROM data_types WHERE name = ? AND unit = ?",
        )
        .bind(name)
        .bind(unit)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Data type {name} [{unit}]")))
    }

    /// List all data types ordered by ID.
    pub async fn list_data_types(&self) -> Result<Vec<DataType>, DatabaseError> {
        let types =
            sqlx::query_as::<_, DataType>("SELECT id, name, unit FROM data_types ORDER BY id")
                .fetch_all(self.pool())
                .await?;

        Ok(types)
    }

    // =========================================================================
    // Reading queries
    // =========================================================================

    /// Append a reading for a device.
    pub async fn insert_reading(
        &self,
        device_id: i64,
        data_type_id: i64,
        value: f64,
        timestamp: i64,
    ) -> Result<Reading, DatabaseError> {
        let reading = sqlx::query_as::<_, Reading>(
            "INSERT INTO readings (value, timestamp, data_type_id, device_id) VALUES (?, ?, ?, ?) \
             RETURNING id, value, timestamp, data_type_id, device_id",
        )
        .bind(value)
        .bind(timestamp)
        .bind(data_type_id)
        .bind(device_id)
        .fetch_one(self.pool())
        .await?;

        Ok(reading)
    }

    /// List a device's readings, oldest first.
    pub async fn list_readings(&self, device_id: i64) -> Result<Vec<Reading>, DatabaseError> {
        let readings = sqlx::query_as::<_, Reading>(
            "SELECT id, value, timestamp, data_type_id, device_id FROM readings \
             WHERE device_id = ? ORDER BY timestamp, id",
        )
        .bind(device_id)
        .fetch_all(self.pool())
        .await?;

        Ok(readings)
    }
}
