use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{
    jwt::{JwtKeys, TokenError},
    repo_types::Profile,
};
use crate::{error::AppError, state::AppState};

pub const NO_TOKEN: &str = "Not authorized, no token provided";
pub const TOKEN_EXPIRED: &str = "Token expired, please login again";
pub const TOKEN_INVALID: &str = "Invalid token";
pub const USER_GONE: &str = "User not found";

/// Verified identity of the caller, loaded without the password hash.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Profile);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::Unauthenticated(NO_TOKEN.into()))?;

        let user_id = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(reason = %e, "token rejected");
            match e {
                TokenError::Expired => AppError::Unauthenticated(TOKEN_EXPIRED.into()),
                TokenError::Invalid => AppError::Unauthenticated(TOKEN_INVALID.into()),
            }
        })?;

        match state.users.find_profile(user_id).await? {
            Some(profile) => Ok(AuthUser(profile)),
            None => {
                warn!(%user_id, "token for unknown user");
                Err(AppError::Unauthenticated(USER_GONE.into()))
            }
        }
    }
}
