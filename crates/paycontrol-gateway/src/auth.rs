//! Stateless bearer tokens.
//!
//! A token reads `{user_id}.{hex(name)}.{expires_unix}.{hex(hmac_sha256)}`,
//! the signature covering everything before the last dot. Verifying one
//! yields the [`Actor`] that handlers attribute audit entries to.

use anyhow::{Result, anyhow};
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use paycontrol_core::Actor;
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| anyhow!("invalid auth secret: {err}"))?;
        Ok(Self { mac })
    }

    pub fn sign(&self, actor: &Actor, expires_at: DateTime<Utc>) -> String {
        let payload = format!(
            "{}.{}.{}",
            actor.user_id,
            hex::encode(actor.name.as_bytes()),
            expires_at.timestamp()
        );

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        format!("{payload}.{signature}")
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Actor, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let mut parts = payload.split('.');
        let (Some(user_id), Some(name), Some(expires_at), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let user_id = Uuid::parse_str(user_id).map_err(|_| TokenError::Malformed)?;
        let name = hex::decode(name)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(TokenError::Malformed)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| TokenError::Malformed)?;

        if expires_at <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(Actor::new(user_id, name))
    }
}

/// Extractor for routes that require a signed-in caller.
pub struct Authenticated(pub Actor);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    "missing bearer token".to_string(),
                )
            })?;

        match state.tokens.verify(token, Utc::now()) {
            Ok(actor) => Ok(Authenticated(actor)),
            Err(err) => {
                warn!(error = %err, "rejected bearer token");
                Err((StatusCode::UNAUTHORIZED, err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), "Maria da Silva")
    }

    #[test]
    fn signed_token_resolves_the_actor() {
        let signer = TokenSigner::new("segredo").unwrap();
        let actor = actor();
        let now = Utc::now();

        let token = signer.sign(&actor, now + Duration::hours(8));

        assert_eq!(signer.verify(&token, now), Ok(actor));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let signer = TokenSigner::new("segredo").unwrap();
        let other = TokenSigner::new("outro-segredo").unwrap();
        let now = Utc::now();
        let token = signer.sign(&actor(), now + Duration::hours(1));

        assert_eq!(other.verify(&token, now), Err(TokenError::BadSignature));

        let (payload, signature) = token.rsplit_once('.').unwrap();
        let forged = format!("{}.{signature}", payload.replacen('.', "0.", 1));
        assert_eq!(signer.verify(&forged, now), Err(TokenError::BadSignature));

        assert_eq!(signer.verify("garbage", now), Err(TokenError::Malformed));
        assert_eq!(signer.verify("a.b.c.zz", now), Err(TokenError::Malformed));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let signer = TokenSigner::new("segredo").unwrap();
        let now = Utc::now();
        let token = signer.sign(&actor(), now - Duration::seconds(1));

        assert_eq!(signer.verify(&token, now), Err(TokenError::Expired));
    }
}
