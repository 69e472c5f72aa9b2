//! Request extractors for authenticated and admin callers

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::token::{self, TokenError, TokenKind};
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, re-loaded from the database on every request so
/// a deactivated account is locked out immediately.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub is_email_verified: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

        let claims = token::verify(token, TokenKind::Access, &state.config.jwt_secret).map_err(
            |err| match err {
                TokenError::Expired => ApiError::Unauthorized("Token expired".into()),
                TokenError::Invalid => ApiError::Unauthorized("Invalid token".into()),
            },
        )?;

        let user = sqlx::query_as::<_, AuthUser>(
            "SELECT id, name, email, role, is_active, is_email_verified
             FROM users WHERE id = $1",
        )
        .bind(claims.sub)
        .fetch_optional(&state.db)
        .await?;

        match user {
            Some(user) if user.is_active => Ok(user),
            _ => Err(ApiError::Unauthorized("User not found or inactive".into())),
        }
    }
}

/// An authenticated caller holding the `admin` role.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != "admin" {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
