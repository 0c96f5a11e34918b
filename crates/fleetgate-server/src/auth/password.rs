//! Password hashing and verification using argon2id.
//!
//! Services only see the [`CredentialVerifier`] capability, so tests and
//! alternative deployments can swap the cost parameters.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;

/// One-way, salted password hashing.
pub trait CredentialVerifier: Send + Sync {
    /// Hash `password` into a self-describing digest string.
    fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error>;

    /// Check `password` against `digest`. Mismatch is `false`, never an error.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

/// argon2id verifier.
#[derive(Clone, Default)]
pub struct Argon2Verifier {
    argon2: Argon2<'static>,
}

impl Argon2Verifier {
    /// Verifier with explicit memory (KiB), iteration and lane costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, argon2::Error> {
        let params = Params::new(m_cost, t_cost, p_cost, None)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password digest is malformed");
                return false;
            }
        };
        // Parameters come from the digest itself, so digests made with other
        // costs still verify.
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
