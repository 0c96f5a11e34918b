//! Account directories: devices and the admins who approve them.

pub mod admins;
pub mod devices;


pub use admins::{AdminDirectory, AdminSession};
pub use devices::{DeviceDirectory, DeviceSession, StatusReport};

use crate::error::{Error, Result};

/// Username and password presented by a caller.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Validation("Username must not be empty.".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("Password must not be empty.".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
