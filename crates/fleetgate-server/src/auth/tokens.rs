//! Token Service: issuance, verification and the revocation blocklist.
//!
//! `verify` is the single entry point for authenticated requests and always
//! consults the blocklist, so a revoked token is refused even while its
//! signature and expiry are still valid.

use tracing::{debug, info, instrument};

use fleetgate_core::db::unix_timestamp;

use super::jwt::{DecodeFailure, EXPIRY_LEEWAY_SECS, IssuedToken, JwtManager};
use crate::error::{Error, Result};
use crate::storage::{AccountKind, FleetDatabase};

/// Token lifetimes per caller class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub device_ttl_secs: i64,
    pub admin_ttl_secs: i64,
}

impl TokenPolicy {
    pub const fn ttl_for(&self, kind: AccountKind) -> i64 {
        match kind {
            AccountKind::Device => self.device_ttl_secs,
            AccountKind::Admin => self.admin_ttl_secs,
        }
    }
}

/// Identity of an authenticated caller, as proven by its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub subject_id: i64,
    pub token_id: String,
    pub kind: AccountKind,
    /// `exp` claim of the presented token.
    pub expires_at: i64,
}

pub struct TokenService {
    db: FleetDatabase,
    jwt: JwtManager,
    policy: TokenPolicy,
}

impl TokenService {
    pub const fn new(db: FleetDatabase, jwt: JwtManager, policy: TokenPolicy) -> Self {
        Self { db, jwt, policy }
    }

    /// Issue a token for `subject_id` with the lifetime of its class.
    pub fn issue(&self, subject_id: i64, kind: AccountKind) -> Result<IssuedToken> {
        self.jwt
            .issue(subject_id, kind, self.policy.ttl_for(kind))
            .map_err(|e| Error::Internal(format!("Token creation failed: {e}")))
    }

    /// Verify signature, expiry and revocation of a presented token.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Caller> {
        let claims = self.jwt.decode(token).map_err(|failure| match failure {
            DecodeFailure::Expired => Error::ExpiredToken,
            DecodeFailure::Invalid => Error::InvalidToken,
        })?;
        let subject_id = claims.subject_id().ok_or(Error::InvalidToken)?;

        if self.db.is_token_revoked(&claims.jti).await? {
            debug!(token_id = %claims.jti, subject_id, "Revoked token presented");
            return Err(Error::RevokedToken);
        }

        Ok(Caller {
            subject_id,
            token_id: claims.jti,
            kind: claims.kind,
            expires_at: claims.exp,
        })
    }

    /// Add the caller's token to the blocklist. Revoking twice is not an error.
    #[instrument(skip_all, fields(token_id = %caller.token_id))]
    pub async fn revoke(&self, caller: &Caller) -> Result<()> {
        let inserted = self
            .db
            .insert_revoked_token(&caller.token_id, caller.expires_at, unix_timestamp())
            .await?;
        if inserted {
            info!(subject_id = caller.subject_id, "Token revoked");
        } else {
            debug!("Token already revoked");
        }
        Ok(())
    }

    /// Drop blocklist rows whose token would be refused as expired anyway.
    ///
    /// Rows are kept until the token's own `exp` plus the decode leeway has
    /// passed, independent of the TTLs currently configured.
    pub async fn sweep_blocklist(&self, now: i64) -> Result<u64> {
        let cutoff = now - EXPIRY_LEEWAY_SECS;
        Ok(self.db.sweep_revoked_tokens(cutoff).await?)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const POLICY: TokenPolicy = TokenPolicy {
        device_ttl_secs: 365 * 24 * 3600,
        admin_ttl_secs: 1800,
    };

    async fn service() -> TokenService {
        let db = FleetDatabase::open_in_memory().await.unwrap();
        TokenService::new(db, JwtManager::new(b"test-secret"), POLICY)
    }

    fn caller_for(token_id: &str, expires_at: i64) -> Caller {
        Caller {
            subject_id: 1,
            token_id: token_id.into(),
            kind: AccountKind::Device,
            expires_at,
        }
    }

    #[tokio::test]
    async fn ttl_depends_on_caller_class() {
        let tokens = service().await;
        let device = tokens.issue(1, AccountKind::Device).unwrap();
        let admin = tokens.issue(2, AccountKind::Admin).unwrap();

        let now = unix_timestamp();
        assert!(device.expires_at - now > 364 * 24 * 3600);
        assert!(admin.expires_at - now <= 1800);
    }

    #[tokio::test]
    async fn verify_returns_caller() {
        let tokens = service().await;
        let issued = tokens.issue(5, AccountKind::Device).unwrap();

        let caller = tokens.verify(&issued.token).await.unwrap();
        assert_eq!(caller.subject_id, 5);
        assert_eq!(caller.kind, AccountKind::Device);
        assert_eq!(caller.token_id, issued.token_id);
        assert_eq!(caller.expires_at, issued.expires_at);
    }

    #[tokio::test]
    async fn revoked_token_fails_every_time() {
        let tokens = service().await;
        let issued = tokens.issue(5, AccountKind::Admin).unwrap();
        let caller = tokens.verify(&issued.token).await.unwrap();

        tokens.revoke(&caller).await.unwrap();
        for _ in 0..3 {
            assert!(matches!(
                tokens.verify(&issued.token).await,
                Err(Error::RevokedToken)
            ));
        }
    }

    #[tokio::test]
    async fn revoke_twice_is_fine() {
        let tokens = service().await;
        let caller = caller_for("jti", unix_timestamp() + 60);
        tokens.revoke(&caller).await.unwrap();
        tokens.revoke(&caller).await.unwrap();
    }

    #[tokio::test]
    async fn revocation_does_not_leak_to_other_tokens() {
        let tokens = service().await;
        let a = tokens.issue(5, AccountKind::Device).unwrap();
        let b = tokens.issue(5, AccountKind::Device).unwrap();

        let caller = tokens.verify(&a.token).await.unwrap();
        tokens.revoke(&caller).await.unwrap();
        assert!(tokens.verify(&b.token).await.is_ok());
    }

    #[tokio::test]
    async fn expired_and_forged_tokens() {
        let tokens = service().await;
        let expired = JwtManager::new(b"test-secret")
            .issue(5, AccountKind::Device, -3600)
            .unwrap();
        assert!(matches!(
            tokens.verify(&expired.token).await,
            Err(Error::ExpiredToken)
        ));

        let forged = JwtManager::new(b"other-secret")
            .issue(5, AccountKind::Device, 3600)
            .unwrap();
        assert!(matches!(
            tokens.verify(&forged.token).await,
            Err(Error::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn sweep_removes_only_rows_of_dead_tokens() {
        let tokens = service().await;
        let now = unix_timestamp();
        tokens.revoke(&caller_for("live", now + 10)).await.unwrap();
        tokens
            .revoke(&caller_for("dead", now - EXPIRY_LEEWAY_SECS - 10))
            .await
            .unwrap();

        assert_eq!(tokens.sweep_blocklist(now).await.unwrap(), 1);
        assert!(tokens.db.is_token_revoked("live").await.unwrap());
        assert!(!tokens.db.is_token_revoked("dead").await.unwrap());
    }

    #[tokio::test]
    async fn swept_blocklist_still_refuses_token_inside_leeway() {
        let tokens = service().await;
        // Past `exp` but still accepted by decoding because of the leeway.
        let issued = JwtManager::new(b"test-secret")
            .issue(5, AccountKind::Device, -(EXPIRY_LEEWAY_SECS / 2))
            .unwrap();
        let caller = tokens.verify(&issued.token).await.unwrap();

        tokens.revoke(&caller).await.unwrap();
        assert_eq!(tokens.sweep_blocklist(unix_timestamp()).await.unwrap(), 0);
        assert!(matches!(
            tokens.verify(&issued.token).await,
            Err(Error::RevokedToken)
        ));
    }

    #[tokio::test]
    async fn shorter_configured_ttl_does_not_sweep_long_lived_tokens() {
        let db = FleetDatabase::open_in_memory().await.unwrap();
        let long_lived = TokenService::new(db.clone(), JwtManager::new(b"test-secret"), POLICY);
        let issued = long_lived.issue(5, AccountKind::Device).unwrap();
        let caller = long_lived.verify(&issued.token).await.unwrap();
        long_lived.revoke(&caller).await.unwrap();

        // Restarted with much shorter lifetimes, a year later than revocation.
        let short_lived = TokenService::new(
            db,
            JwtManager::new(b"test-secret"),
            TokenPolicy {
                device_ttl_secs: 2,
                admin_ttl_secs: 1,
            },
        );
        let later = unix_timestamp() + 3600;
        assert_eq!(short_lived.sweep_blocklist(later).await.unwrap(), 0);
        assert!(matches!(
            short_lived.verify(&issued.token).await,
            Err(Error::RevokedToken)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revocations_of_one_token_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let db = FleetDatabase::open(&dir.path().join("fleet.db")).await.unwrap();
        let tokens = Arc::new(TokenService::new(
            db.clone(),
            JwtManager::new(b"test-secret"),
            POLICY,
        ));
        let issued = tokens.issue(5, AccountKind::Device).unwrap();
        let caller = tokens.verify(&issued.token).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tokens = Arc::clone(&tokens);
            let caller = caller.clone();
            handles.push(tokio::spawn(async move { tokens.revoke(&caller).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE token_id = ?")
            .bind(&caller.token_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert!(matches!(
            tokens.verify(&issued.token).await,
            Err(Error::RevokedToken)
        ));
    }
}
