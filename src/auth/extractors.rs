use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{claims::AuthContext, jwt::JwtKeys};
use crate::error::{AppError, INVALID_TOKEN, UNAUTHORIZED};

/// Any caller holding a valid token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub AuthContext);

/// A caller whose token carries the admin flag.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthContext);

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthenticated(UNAUTHORIZED))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated(UNAUTHORIZED))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated(UNAUTHORIZED))?;
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);
        match keys.verify(token) {
            Ok(ctx) => Ok(AuthUser(ctx)),
            Err(e) => {
                warn!(error = %e, "rejected bearer token");
                Err(AppError::Unauthenticated(INVALID_TOKEN))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(ctx) = AuthUser::from_request_parts(parts, state).await?;
        if !ctx.is_admin {
            warn!(user_id = %ctx.user_id, "admin route refused for non-admin");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(ctx))
    }
}
