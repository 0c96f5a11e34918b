//! Device Directory: registration, login and the device status lifecycle.
//!
//! Statuses move `CREATED -> APPROVED | BLACKLISTED`, any live status to
//! `DELETED` (self-service), and `DELETED -> CREATED` through
//! re-registration with the same serial number. Admins may set any known
//! status directly; legality of that jump is not checked.
//!
//! A blacklisted device is cut off lazily: the next time it presents a
//! token, that token is revoked and the request is refused.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{AdminDirectory, Credentials};
use crate::auth::{Caller, CredentialVerifier, TokenService};
use crate::error::{Error, Result};
use crate::storage::{
    AccountKind, DatabaseError, Device, DeviceStatus, FleetDatabase, UnknownStatus,
};

const DEVICE_NOT_FOUND: &str = "Device not found or invalid ID provided.";

/// A device together with a freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSession {
    pub access_token: String,
    pub device: Device,
}

/// Result of a device checking its own status.
///
/// Approved devices get a fresh token; other live statuses get none.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub device: Device,
}

pub struct DeviceDirectory {
    db: FleetDatabase,
    tokens: Arc<TokenService>,
    credentials: Arc<dyn CredentialVerifier>,
    admins: Arc<AdminDirectory>,
}

impl DeviceDirectory {
    pub fn new(
        db: FleetDatabase,
        tokens: Arc<TokenService>,
        credentials: Arc<dyn CredentialVerifier>,
        admins: Arc<AdminDirectory>,
    ) -> Self {
        Self {
            db,
            tokens,
            credentials,
            admins,
        }
    }

    /// Register a new device, or reactivate a deleted one with the same serial.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(
        &self,
        credentials: &Credentials,
        serial_number: &str,
    ) -> Result<DeviceSession> {
        credentials.validate()?;
        if serial_number.trim().is_empty() {
            return Err(Error::Validation("Serial number must not be empty.".into()));
        }

        let digest = self
            .credentials
            .hash(&credentials.password)
            .map_err(|e| Error::Internal(format!("Password hashing failed: {e}")))?;

        let registration = self
            .db
            .register_device(&credentials.username, &digest, serial_number)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => Error::Conflict(
                    "Registration could not be completed due to a conflict. \
                     Serial number or username already exists."
                        .into(),
                ),
                other => other.into(),
            })?;

        let device = registration.device;
        let issued = self.tokens.issue(device.id(), AccountKind::Device)?;

        if registration.reactivated {
            info!(device_id = device.id(), serial_number, "Deleted device reactivated");
        } else {
            info!(device_id = device.id(), serial_number, "Device registered");
        }

        Ok(DeviceSession {
            access_token: issued.token,
            device,
        })
    }

    /// Authenticate a device by ID and credentials and issue a token.
    #[instrument(skip(self, credentials))]
    pub async fn login(&self, id: i64, credentials: &Credentials) -> Result<DeviceSession> {
        let device = self.authenticate(id, credentials).await?;

        match device.status {
            DeviceStatus::Blacklisted => {
                warn!(device_id = id, "Blacklisted device attempted login");
                Err(Error::Forbidden)
            }
            DeviceStatus::Deleted => Err(Error::AccountDeleted),
            DeviceStatus::Created | DeviceStatus::Approved => {
                let issued = self.tokens.issue(id, AccountKind::Device)?;
                info!(device_id = id, status = %device.status, "Device logged in");
                Ok(DeviceSession {
                    access_token: issued.token,
                    device,
                })
            }
        }
    }

    /// Report the calling device's own status.
    ///
    /// A blacklisted caller has its presented token revoked before the
    /// request is refused.
    #[instrument(skip(self, caller), fields(device_id = caller.subject_id))]
    pub async fn check_status(&self, caller: &Caller) -> Result<StatusReport> {
        let device = self
            .db
            .get_device(caller.subject_id)
            .await
            .map_err(Error::not_found("Device not found."))?;

        match device.status {
            DeviceStatus::Blacklisted => Err(self.refuse_blacklisted(caller).await),
            DeviceStatus::Approved => {
                let issued = self.tokens.issue(device.id(), AccountKind::Device)?;
                Ok(StatusReport {
                    access_token: Some(issued.token),
                    device,
                })
            }
            DeviceStatus::Created | DeviceStatus::Deleted => Ok(StatusReport {
                access_token: None,
                device,
            }),
        }
    }

    /// Set a device's status by name on behalf of an admin.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        admin_id: i64,
        device_id: i64,
        status_name: &str,
    ) -> Result<Device> {
        if self.admins.find(admin_id).await?.is_none() {
            warn!(admin_id, "Status update requested by a non-admin");
            return Err(Error::NotFound("User not found.".into()));
        }

        let status: DeviceStatus = status_name
            .parse()
            .map_err(|e: UnknownStatus| Error::InvalidStatus(e.0))?;

        let device = self
            .db
            .update_device_status(device_id, status)
            .await
            .map_err(Error::not_found(DEVICE_NOT_FOUND))?;

        info!(admin_id, device_id, %status, "Device status updated");
        Ok(device)
    }

    /// Credential-checked self-service soft delete.
    #[instrument(skip(self, credentials))]
    pub async fn delete(&self, id: i64, credentials: &Credentials) -> Result<Device> {
        let device = self.authenticate(id, credentials).await?;
        refuse_delete(device.status)?;

        if !self.db.soft_delete_device(id).await? {
            // Status changed between the read and the guarded update.
            let current = self.db.get_device(id).await?;
            refuse_delete(current.status)?;
            return Err(Error::Conflict(
                "Device status changed while deleting.".into(),
            ));
        }

        info!(device_id = id, "Device deleted");
        Ok(self.db.get_device(id).await?)
    }

    /// All devices, for admins.
    pub async fn list_all(&self, admin_id: i64) -> Result<Vec<Device>> {
        self.require_admin(admin_id).await?;
        Ok(self.db.list_devices(None).await?)
    }

    /// Devices still waiting for approval, for admins.
    pub async fn list_pending(&self, admin_id: i64) -> Result<Vec<Device>> {
        self.require_admin(admin_id).await?;
        Ok(self.db.list_devices(Some(DeviceStatus::Created)).await?)
    }

    /// Resolve the calling device and require it to be `APPROVED`.
    ///
    /// Any other status is refused; a blacklisted caller also loses the
    /// token it presented.
    pub async fn require_approved(&self, caller: &Caller) -> Result<Device> {
        let device = self
            .db
            .get_device(caller.subject_id)
            .await
            .map_err(Error::not_found("Device not found."))?;

        match device.status {
            DeviceStatus::Approved => Ok(device),
            DeviceStatus::Blacklisted => Err(self.refuse_blacklisted(caller).await),
            DeviceStatus::Created | DeviceStatus::Deleted => {
                warn!(device_id = device.id(), status = %device.status, "Device is not approved");
                Err(Error::Forbidden)
            }
        }
    }

    /// Revoke the caller's token and build the refusal for a blacklisted device.
    ///
    /// If the revocation itself fails, that failure is returned instead.
    async fn refuse_blacklisted(&self, caller: &Caller) -> Error {
        warn!(
            device_id = caller.subject_id,
            token_id = %caller.token_id,
            "Blacklisted device presented a token; revoking it"
        );
        match self.tokens.revoke(caller).await {
            Ok(()) => Error::Forbidden,
            Err(e) => e,
        }
    }

    async fn authenticate(&self, id: i64, credentials: &Credentials) -> Result<Device> {
        let device = self
            .db
            .get_device(id)
            .await
            .map_err(Error::not_found(DEVICE_NOT_FOUND))?;

        if device.account.username != credentials.username
            || !self
                .credentials
                .verify(&credentials.password, &device.account.password_digest)
        {
            warn!(device_id = id, "Failed device authentication");
            return Err(Error::InvalidCredentials);
        }

        Ok(device)
    }

    async fn require_admin(&self, admin_id: i64) -> Result<()> {
        if self.admins.find(admin_id).await?.is_none() {
            warn!(admin_id, "Device listing requested by a non-admin");
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}

fn refuse_delete(status: DeviceStatus) -> Result<()> {
    match status {
        DeviceStatus::Blacklisted => Err(Error::Forbidden),
        DeviceStatus::Deleted => Err(Error::AlreadyDeleted),
        DeviceStatus::Created | DeviceStatus::Approved => Ok(()),
    }
}
