//! Admin Directory: administrator accounts and their sessions.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::Credentials;
use crate::auth::{Caller, CredentialVerifier, TokenService};
use crate::error::{Error, Result};
use crate::storage::{AccountKind, Admin, DatabaseError, FleetDatabase};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// A signed-in admin.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub access_token: String,
    #[serde(rename = "user")]
    pub admin: Admin,
}

pub struct AdminDirectory {
    db: FleetDatabase,
    tokens: Arc<TokenService>,
    credentials: Arc<dyn CredentialVerifier>,
}

impl AdminDirectory {
    pub fn new(
        db: FleetDatabase,
        tokens: Arc<TokenService>,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            db,
            tokens,
            credentials,
        }
    }

    /// Resolve an account ID to an admin, if it is one.
    pub async fn find(&self, id: i64) -> Result<Option<Admin>> {
        match self.db.get_admin(id).await {
            Ok(admin) => Ok(Some(admin)),
            Err(DatabaseError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(&self, credentials: &Credentials) -> Result<Admin> {
        credentials.validate()?;

        if self.db.get_admin_by_username(&credentials.username).await.is_ok() {
            return Err(Error::Conflict(USERNAME_TAKEN.into()));
        }

        let digest = self
            .credentials
            .hash(&credentials.password)
            .map_err(|e| Error::Internal(format!("Password hashing failed: {e}")))?;

        let admin = self
            .db
            .create_admin(&credentials.username, &digest)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => Error::Conflict(USERNAME_TAKEN.into()),
                other => other.into(),
            })?;

        info!(admin_id = admin.account.id, "Admin registered");
        Ok(admin)
    }

    /// Issue a short-lived admin session token.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<AdminSession> {
        let admin = self
            .db
            .get_admin_by_username(&credentials.username)
            .await
            .map_err(Error::not_found("A user with that username not found."))?;

        if !self
            .credentials
            .verify(&credentials.password, &admin.account.password_digest)
        {
            warn!(admin_id = admin.account.id, "Failed admin login attempt");
            return Err(Error::InvalidCredentials);
        }

        let issued = self.tokens.issue(admin.account.id, AccountKind::Admin)?;
        info!(admin_id = admin.account.id, "Admin logged in");

        Ok(AdminSession {
            access_token: issued.token,
            admin,
        })
    }

    /// Revoke the token the caller presented.
    #[instrument(skip(self, caller), fields(subject_id = caller.subject_id))]
    pub async fn logout(&self, caller: &Caller) -> Result<()> {
        self.tokens.revoke(caller).await
    }

    /// Hard-delete the caller's own admin account and revoke its token.
    #[instrument(skip(self, caller), fields(subject_id = caller.subject_id))]
    pub async fn delete_self(&self, caller: &Caller) -> Result<()> {
        if !self.db.delete_admin(caller.subject_id).await? {
            warn!("Delete requested by a caller that is not an admin");
            return Err(Error::Forbidden);
        }

        self.tokens.revoke(caller).await?;
        info!(admin_id = caller.subject_id, "Admin deleted");
        Ok(())
    }
}
