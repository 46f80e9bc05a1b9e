use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::{claims::Principal, error::AuthError, jwt::JwtKeys};
use crate::error::ApiError;

/// Authenticated caller. Add it to a handler's arguments to require a token.
pub struct AuthUser(pub Principal);

/// Pulls `<token>` out of an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    lazy_static! {
        static ref BEARER_RE: Regex = Regex::new(r"^Bearer ([^\s]+)$").unwrap();
    }
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    BEARER_RE
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(AuthError::MalformedHeader)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).map_err(|e| {
            warn!(reason = %e, "rejected Authorization header");
            e
        })?;

        let keys = JwtKeys::from_ref(state);
        let principal = keys.verify(token).map_err(|e| {
            warn!("invalid or expired token");
            e
        })?;

        Ok(AuthUser(principal))
    }
}
