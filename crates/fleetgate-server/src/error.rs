//! Error taxonomy for `FleetGate` server operations.
//!
//! Every failure carries a stable machine-readable kind and an HTTP status
//! class; the HTTP layer renders both.

use axum::http::StatusCode;
use tracing::warn;

use crate::storage::DatabaseError;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or incomplete input.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Request does not contain an access token.")]
    MissingToken,

    #[error("Signature verification failed.")]
    InvalidToken,

    #[error("The token has expired.")]
    ExpiredToken,

    #[error("The token has been revoked.")]
    RevokedToken,

    #[error("{0}")]
    NotFound(String),

    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),

    /// The caller's status or role disallows the operation.
    #[error("Access to the requested resource is forbidden.")]
    Forbidden,

    #[error("The device cannot be logged in because the account has been deleted. Please register again.")]
    AccountDeleted,

    #[error("Device is already deleted.")]
    AlreadyDeleted,

    #[error("Invalid device status provided: {0:?}")]
    InvalidStatus(String),

    #[error("Error connecting to the database.")]
    StoreUnavailable(String),

    #[error("An error occurred while accessing the database.")]
    Store(String),

    /// Failure inside the server itself (hashing, token signing).
    #[error("Internal server error.")]
    Internal(String),
}

impl Error {
    /// Stable snake_case identifier for clients.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::MissingToken => "authorization_required",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "token_expired",
            Self::RevokedToken => "token_revoked",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden => "forbidden",
            Self::AccountDeleted => "account_deleted",
            Self::AlreadyDeleted => "already_deleted",
            Self::InvalidStatus(_) => "invalid_status",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::MissingToken
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::RevokedToken
            | Self::AccountDeleted => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::AlreadyDeleted => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Map a store lookup, turning `NotFound` into a caller-facing message.
    pub fn not_found(message: &str) -> impl FnOnce(DatabaseError) -> Self + '_ {
        move |e| match e {
            DatabaseError::NotFound(_) => Self::NotFound(message.to_string()),
            other => other.into(),
        }
    }
}

impl From<DatabaseError> for Error {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(format!("{what} not found.")),
            DatabaseError::Conflict(what) => Self::Conflict(what),
            e if e.is_unavailable() => {
                warn!(error = %e, "Store unavailable");
                Self::StoreUnavailable(e.to_string())
            }
            other => {
                warn!(error = %other, "Store failure");
                Self::Store(other.to_string())
            }
        }
    }
}
