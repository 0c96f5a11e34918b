//! Data models for `FleetGate` storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discriminates the two account specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccountKind {
    Admin,
    Device,
}

impl AccountKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Created,
    Approved,
    Blacklisted,
    Deleted,
}

impl DeviceStatus {
    pub const ALL: [Self; 4] = [
        Self::Created,
        Self::Approved,
        Self::Blacklisted,
        Self::Deleted,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Blacklisted => "BLACKLISTED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status name is not one of the known statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for DeviceStatus {
    type Err = UnknownStatus;

    /// Status names are matched exactly, as stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Identity fields shared by admins and devices.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub account: Account,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub account: Account,
    pub serial_number: String,
    pub status: DeviceStatus,
}

impl Device {
    pub const fn id(&self) -> i64 {
        self.account.id
    }
}

/// Deduplicated (name, unit) descriptor of a measurement kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DataType {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: i64,
    pub value: f64,
    pub timestamp: i64,
    pub data_type_id: i64,
    pub device_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RevokedToken {
    pub id: i64,
    pub token_id: String,
    /// `exp` claim of the revoked token.
    pub expires_at: i64,
    pub revoked_at: i64,
}
