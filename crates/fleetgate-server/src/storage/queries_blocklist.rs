//! Revoked-token blocklist queries.
//!
//! Each row carries the `exp` of the token it blocks. A row is only swept
//! once that token would fail expiry validation on its own.

use super::db::{DatabaseError, FleetDatabase};
#[cfg(test)]
use super::models::RevokedToken;

impl FleetDatabase {
    /// Record `token_id` as revoked.
    ///
    /// Returns `false` if it was already present; concurrent revocations of
    /// the same id are absorbed by the unique constraint.
    pub async fn insert_revoked_token(
        &self,
        token_id: &str,
        expires_at: i64,
        revoked_at: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO revoked_tokens (token_id, expires_at, revoked_at) VALUES (?, ?, ?) \
             ON CONFLICT(token_id) DO NOTHING",
        )
        .bind(token_id)
        .bind(expires_at)
        .bind(revoked_at)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether `token_id` is on the blocklist.
    pub async fn is_token_revoked(&self, token_id: &str) -> Result<bool, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE token_id = ?")
            .bind(token_id)
            .fetch_one(self.pool())
            .await?;

        Ok(count > 0)
    }

    /// Get the blocklist entry for `token_id`, if any.
    #[cfg(test)]
    pub async fn get_revoked_token(
        &self,
        token_id: &str,
    ) -> Result<Option<RevokedToken>, DatabaseError> {
        let entry = sqlx::query_as::<_, RevokedToken>(
            "SELECT id, token_id, expires_at, revoked_at FROM revoked_tokens WHERE token_id = ?",
        )
        .bind(token_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(entry)
    }

    /// Delete entries whose token expired before `cutoff`. Returns the number removed.
    pub async fn sweep_revoked_tokens(&self, cutoff: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(cutoff)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
