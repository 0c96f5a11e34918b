//! Request extractors for bearer tokens, header credentials and JSON bodies.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::auth::Caller;
use crate::directory::Credentials;
use crate::error::Error;
use crate::state::AppState;

/// The verified identity behind an `Authorization: Bearer` token.
///
/// Verification always checks the revocation blocklist.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Caller);

impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingToken)?;

        state.tokens.verify(token).await.map(Self)
    }
}

/// Credentials from the `username` and `password` request headers.
#[derive(Debug, Clone)]
pub struct HeaderCredentials(pub Credentials);

impl<S: Send + Sync> FromRequestParts<S> for HeaderCredentials {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| Error::Validation(format!("Missing required header: {name}")))
        };

        Ok(Self(Credentials::new(header("username")?, header("password")?)))
    }
}

/// `Json` whose rejections render as validation errors.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| Error::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
