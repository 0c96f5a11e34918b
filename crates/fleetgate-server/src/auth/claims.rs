//! JWT claims structure for `FleetGate` tokens.

use serde::{Deserialize, Serialize};

use crate::storage::AccountKind;

/// JWT claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token); the blocklist key.
    pub jti: String,
    /// Subject (account ID, decimal).
    pub sub: String,
    /// Which account class the token was issued to.
    pub kind: AccountKind,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into an account ID.
    pub fn subject_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
