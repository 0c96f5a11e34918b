//! Authentication for the `FleetGate` server.
//!
//! Provides password hashing, JWT signing and the Token Service that owns
//! the revocation blocklist.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod tokens;

pub use claims::Claims;
pub use jwt::{IssuedToken, JwtManager};
pub use password::{Argon2Verifier, CredentialVerifier};
pub use tokens::{Caller, TokenPolicy, TokenService};
