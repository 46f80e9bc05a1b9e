use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{
    claims::{Claims, Principal},
    error::AuthError,
};
use crate::{config::JwtConfig, state::AppState};

/// Signing and verification keys plus the claims every token must carry.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: TimeDuration::days(cfg.ttl_days),
        }
    }

    pub fn sign(&self, principal: &Principal) -> anyhow::Result<String> {
        self.sign_at(principal, OffsetDateTime::now_utc())
    }

    pub fn sign_at(&self, principal: &Principal, issued_at: OffsetDateTime) -> anyhow::Result<String> {
        let exp = issued_at + self.ttl;
        let claims = Claims {
            user_id: principal.user_id,
            username: principal.username.clone(),
            iat: issued_at.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = principal.user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature, issuer and audience, then requires `now < exp`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError::InvalidToken
        })?;

        if now.unix_timestamp() >= data.claims.exp {
            debug!(user_id = data.claims.user_id, "jwt expired");
            return Err(AuthError::InvalidToken);
        }

        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims.into())
    }
}
