use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

/// Every token lives exactly this long from issuance.
pub const TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(TOKEN_TTL.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Returns the embedded user id, telling expiry apart from everything else.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        // jsonwebtoken only rejects once `exp` is strictly in the past
        if OffsetDateTime::now_utc().unix_timestamp() >= data.claims.exp as i64 {
            return Err(TokenError::Expired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_with(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
        })
    }

    fn keys() -> JwtKeys {
        keys_with("dev-secret", "test-issuer", "test-aud")
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("sign");
        assert_eq!(keys.verify(&token), Ok(user_id));
    }

    #[test]
    fn token_expires_thirty_days_after_issue() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let almost = now - TimeDuration::days(30) + TimeDuration::minutes(5);
        let token = keys.issue_at(user_id, almost).unwrap();
        assert_eq!(keys.verify(&token), Ok(user_id));

        let stale = now - TimeDuration::days(30) - TimeDuration::minutes(5);
        let token = keys.issue_at(user_id, stale).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_is_expired_at_its_expiry_second() {
        let keys = keys();
        let issued = OffsetDateTime::now_utc() - TimeDuration::seconds(TOKEN_TTL.as_secs() as i64);
        let token = keys.issue_at(Uuid::new_v4(), issued).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = keys_with("one", "test-issuer", "test-aud")
            .issue(Uuid::new_v4())
            .unwrap();
        let other = keys_with("two", "test-issuer", "test-aud");
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_issuer_or_audience_is_invalid() {
        let token = keys_with("same", "good-iss", "good-aud")
            .issue(Uuid::new_v4())
            .unwrap();
        assert_eq!(
            keys_with("same", "bad-iss", "good-aud").verify(&token),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            keys_with("same", "good-iss", "bad-aud").verify(&token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(keys().verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(keys().verify(""), Err(TokenError::Invalid));
    }
}
