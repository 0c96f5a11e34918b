//! JWT signing and decoding.

use fleetgate_core::db::unix_timestamp;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use super::claims::Claims;
use crate::storage::AccountKind;

/// Seconds past `exp` during which a token still decodes.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// A freshly signed token together with its identifying metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: String,
    pub expires_at: i64,
}

/// Why a presented token failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    Expired,
    Invalid,
}

/// Signs and decodes HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::default();
        validation.leeway = EXPIRY_LEEWAY_SECS.unsigned_abs();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `subject_id` that expires `ttl_secs` from now.
    pub fn issue(
        &self,
        subject_id: i64,
        kind: AccountKind,
        ttl_secs: i64,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: subject_id.to_string(),
            kind,
            iat: now,
            exp: now + ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Check signature and expiry, returning the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeFailure> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => DecodeFailure::Expired,
                _ => DecodeFailure::Invalid,
            })
    }
}
