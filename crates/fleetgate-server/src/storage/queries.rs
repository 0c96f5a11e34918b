//! Account and device queries for the `FleetGate` server.

use fleetgate_core::db::unix_timestamp;
use sqlx::{Executor, Sqlite};

use super::db::{DatabaseError, FleetDatabase};
use super::models::{Admin, Device, DeviceStatus};

const ADMIN_SELECT: &str = "SELECT id, username, password_digest, created_at, updated_at \
     FROM accounts WHERE kind = 'admin'";

const DEVICE_SELECT: &str = "SELECT a.id, a.username, a.password_digest, a.created_at, \
     a.updated_at, d.serial_number, d.status \
     FROM devices d JOIN accounts a ON a.id = d.account_id";

/// Outcome of a device registration.
#[derive(Debug, Clone)]
pub struct DeviceRegistration {
    pub device: Device,
    /// True when a previously deleted record was brought back.
    pub reactivated: bool,
}

async fn fetch_device<'e, E>(executor: E, id: i64) -> Result<Option<Device>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Device>(&format!("{DEVICE_SELECT} WHERE d.account_id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

impl FleetDatabase {
    // =========================================================================
    // Admin queries
    // =========================================================================

    /// Create a new admin account.
    pub async fn create_admin(
        &self,
        username: &str,
        password_digest: &str,
    ) -> Result<Admin, DatabaseError> {
        let now = unix_timestamp();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (kind, username, password_digest, created_at, updated_at) \
             VALUES ('admin', ?, ?, ?, ?) RETURNING id",
        )
        .bind(username)
        .bind(password_digest)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        self.get_admin(id).await
    }

    /// Get an admin by account ID.
    pub async fn get_admin(&self, id: i64) -> Result<Admin, DatabaseError> {
        sqlx::query_as::<_, Admin>(&format!("{ADMIN_SELECT} AND id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Admin {id}")))
    }

    /// Get an admin by username.
    pub async fn get_admin_by_username(&self, username: &str) -> Result<Admin, DatabaseError> {
        sqlx::query_as::<_, Admin>(&format!("{ADMIN_SELECT} AND username = ?"))
            .bind(username)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Admin with username {username}")))
    }

    /// Hard-delete an admin account. Device accounts are never touched.
    pub async fn delete_admin(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ? AND kind = 'admin'")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Device queries
    // =========================================================================

    /// Register a device, or reactivate the deleted device holding `serial_number`.
    ///
    /// Reactivation keeps the account id and replaces username and password
    /// digest. A serial number held by a device in any other status fails
    /// with `Conflict`, as does a username held by another account.
    ///
    /// The transaction opens with a write so the `SQLite` write lock is held
    /// before the branch is taken.
    pub async fn register_device(
        &self,
        username: &str,
        password_digest: &str,
        serial_number: &str,
    ) -> Result<DeviceRegistration, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let revived: Option<i64> = sqlx::query_scalar(
            "UPDATE devices SET status = 'CREATED' \
             WHERE serial_number = ? AND status = 'DELETED' RETURNING account_id",
        )
        .bind(serial_number)
        .fetch_optional(&mut *tx)
        .await?;

        let (id, reactivated) = if let Some(id) = revived {
            sqlx::query(
                "UPDATE accounts SET username = ?, password_digest = ?, updated_at = ? WHERE id = ?",
            )
            .bind(username)
            .bind(password_digest)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            (id, true)
        } else {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO accounts (kind, username, password_digest, created_at, updated_at) \
                 VALUES ('device', ?, ?, ?, ?) RETURNING id",
            )
            .bind(username)
            .bind(password_digest)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO devices (account_id, serial_number, status) VALUES (?, ?, 'CREATED')",
            )
            .bind(id)
            .bind(serial_number)
            .execute(&mut *tx)
            .await?;
            (id, false)
        };

        let device = fetch_device(&mut *tx, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {id}")))?;
        tx.commit().await?;

        Ok(DeviceRegistration {
            device,
            reactivated,
        })
    }

    /// Get a device by account ID.
    pub async fn get_device(&self, id: i64) -> Result<Device, DatabaseError> {
        fetch_device(self.pool(), id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {id}")))
    }

    /// Get a device by serial number, whatever its status.
    #[cfg(test)]
    pub async fn get_device_by_serial(&self, serial_number: &str) -> Result<Device, DatabaseError> {
        sqlx::query_as::<_, Device>(&format!("{DEVICE_SELECT} WHERE d.serial_number = ?"))
            .bind(serial_number)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device with serial {serial_number}")))
    }

    /// List devices ordered by ID, optionally filtered by status.
    pub async fn list_devices(
        &self,
        status_filter: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, DatabaseError> {
        let devices = if let Some(status) = status_filter {
            sqlx::query_as::<_, Device>(&format!(
                "{DEVICE_SELECT} WHERE d.status = ? ORDER BY a.id"
            ))
            .bind(status)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, Device>(&format!("{DEVICE_SELECT} ORDER BY a.id"))
                .fetch_all(self.pool())
                .await?
        };

        Ok(devices)
    }

    /// Set a device's status and return the updated record.
    pub async fn update_device_status(
        &self,
        id: i64,
        status: DeviceStatus,
    ) -> Result<Device, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("UPDATE devices SET status = ? WHERE account_id = ?")
            .bind(status)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Device {id}")));
        }

        sqlx::query("UPDATE accounts SET updated_at = ? WHERE id = ?")
            .bind(unix_timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let device = fetch_device(&mut *tx, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {id}")))?;
        tx.commit().await?;

        Ok(device)
    }

    /// Move a device to `DELETED` unless it is already deleted or blacklisted.
    ///
    /// Returns `false` when the status guard refused the transition.
    pub async fn soft_delete_device(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE devices SET status = 'DELETED' \
             WHERE account_id = ? AND status IN ('CREATED', 'APPROVED')",
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
