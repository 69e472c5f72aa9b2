//! Registration, login and session management

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::audit::log_activity;
use crate::auth::password::{generate_token, hash_password, verify_password};
use crate::auth::token::{self, TokenError, TokenKind};
use crate::auth::AuthUser;
use crate::email::{fire_and_forget, password_reset_email, verification_email};
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterBody {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 80))]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    body.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let password_hash = hash_password(&body.password, state.config.bcrypt_cost)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let user_id = Uuid::new_v4();
    let verification_token = generate_token();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, phone, address, city, country)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(user_id)
    .bind(&body.name)
    .bind(&body.email)
    .bind(&password_hash)
    .bind(&body.phone)
    .bind(&body.address)
    .bind(&body.city)
    .bind(&body.country)
    .execute(&state.db)
    .await?;

    sqlx::query(
        "INSERT INTO email_verifications (id, user_id, token, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&verification_token)
    .bind(Utc::now() + Duration::hours(24))
    .execute(&state.db)
    .await?;

    log_activity(&state.db, Some(user_id), "user_registered", None, None, "New user registration")
        .await;

    let (subject, text) = verification_email(&state.config.frontend_url, &verification_token);
    fire_and_forget(state.mailer.clone(), body.email.clone(), subject, text);

    // Usable session immediately; verification gates ordering only
    let access = token::issue(user_id, "user", TokenKind::Access, &state.config.jwt_secret,
        state.config.jwt_ttl_secs)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Registration successful. Please check your email to verify your account.",
            json!({
                "user": {
                    "id": user_id,
                    "name": body.name,
                    "email": body.email,
                    "role": "user",
                    "isEmailVerified": false,
                },
                "token": access,
            }),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, sqlx::FromRow)]
struct LoginRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    is_email_verified: bool,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let user: Option<LoginRow> = sqlx::query_as(
        "SELECT id, name, email, password_hash, role, is_active, is_email_verified
         FROM users WHERE email = $1",
    )
    .bind(&body.email)
    .fetch_optional(&state.db)
    .await?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    };
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".into()));
    }
    let valid = verify_password(&body.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;
    log_activity(&state.db, Some(user.id), "user_login", None, None, "User logged in").await;

    let access = token::issue(user.id, &user.role, TokenKind::Access, &state.config.jwt_secret,
        state.config.jwt_ttl_secs)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let refresh = token::issue(user.id, &user.role, TokenKind::Refresh,
        &state.config.jwt_refresh_secret, state.config.jwt_refresh_ttl_secs)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        json!({
            "user": {
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role,
                "isEmailVerified": user.is_email_verified,
            },
            "token": access,
            "refreshToken": refresh,
        }),
    )))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let row: Option<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT id, user_id FROM email_verifications
         WHERE token = $1 AND is_used = FALSE AND expires_at > NOW()",
    )
    .bind(&query.token)
    .fetch_optional(&state.db)
    .await?;

    let Some((verification_id, user_id)) = row else {
        return Err(ApiError::bad_request("Invalid or expired verification token"));
    };

    sqlx::query("UPDATE users SET is_email_verified = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;
    sqlx::query("UPDATE email_verifications SET is_used = TRUE WHERE id = $1")
        .bind(verification_id)
        .execute(&state.db)
        .await?;
    log_activity(&state.db, Some(user_id), "email_verified", None, None,
        "User verified email address")
        .await;

    Ok(Json(ApiResponse::message("Email verified successfully")))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    // Same response whether or not the account exists
    let response = ApiResponse::message("If email exists, password reset link has been sent");

    let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?;
    let Some((user_id,)) = user else {
        return Ok(Json(response));
    };

    let reset_token = generate_token();
    sqlx::query(
        "UPDATE users SET reset_password_token = $1, reset_password_expires = $2 WHERE id = $3",
    )
    .bind(&reset_token)
    .bind(Utc::now() + Duration::hours(1))
    .bind(user_id)
    .execute(&state.db)
    .await?;

    let (subject, text) = password_reset_email(&state.config.frontend_url, &reset_token);
    fire_and_forget(state.mailer.clone(), body.email.clone(), subject, text);
    log_activity(&state.db, Some(user_id), "password_reset_requested", None, None,
        "Password reset requested")
        .await;

    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordBody {
    pub token: String,
    #[validate(length(min = 8, max = 80))]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    body.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;

    let user: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM users WHERE reset_password_token = $1 AND reset_password_expires > NOW()",
    )
    .bind(&body.token)
    .fetch_optional(&state.db)
    .await?;
    let Some((user_id,)) = user else {
        return Err(ApiError::bad_request("Invalid or expired reset token"));
    };

    let password_hash = hash_password(&body.password, state.config.bcrypt_cost)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    sqlx::query(
        "UPDATE users SET password_hash = $1, reset_password_token = NULL,
         reset_password_expires = NULL WHERE id = $2",
    )
    .bind(&password_hash)
    .bind(user_id)
    .execute(&state.db)
    .await?;
    log_activity(&state.db, Some(user_id), "password_reset", None, None,
        "Password reset completed")
        .await;

    Ok(Json(ApiResponse::message("Password reset successful")))
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let claims = token::verify(&body.refresh_token, TokenKind::Refresh,
        &state.config.jwt_refresh_secret)
        .map_err(|err| match err {
            TokenError::Expired => ApiError::Unauthorized("Invalid or expired refresh token".into()),
            TokenError::Invalid => ApiError::Unauthorized("Invalid refresh token".into()),
        })?;

    let user: Option<(String, bool)> =
        sqlx::query_as("SELECT role, is_active FROM users WHERE id = $1")
            .bind(claims.sub)
            .fetch_optional(&state.db)
            .await?;
    let Some((role, true)) = user else {
        return Err(ApiError::Unauthorized("User not found or inactive".into()));
    };

    let access = token::issue(claims.sub, &role, TokenKind::Access, &state.config.jwt_secret,
        state.config.jwt_ttl_secs)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let refresh = token::issue(claims.sub, &role, TokenKind::Refresh,
        &state.config.jwt_refresh_secret, state.config.jwt_refresh_ttl_secs)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ApiResponse::data(json!({ "token": access, "refreshToken": refresh }))))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub role: String,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let profile: Profile = sqlx::query_as(
        "SELECT id, name, email, phone, address, city, country, role, is_email_verified,
         created_at FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(ApiResponse::data(json!({ "user": profile }))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileBody {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateProfileBody>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    body.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;

    sqlx::query(
        "UPDATE users SET name = $1, phone = $2, address = $3, city = $4, country = $5,
         updated_at = NOW() WHERE id = $6",
    )
    .bind(&body.name)
    .bind(&body.phone)
    .bind(&body.address)
    .bind(&body.city)
    .bind(&body.country)
    .bind(user.id)
    .execute(&state.db)
    .await?;
    log_activity(&state.db, Some(user.id), "profile_updated", None, None, "User updated profile")
        .await;

    let profile: Profile = sqlx::query_as(
        "SELECT id, name, email, phone, address, city, country, role, is_email_verified,
         created_at FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(ApiResponse::with_message("Profile updated successfully", json!({ "user": profile }))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordBody {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    #[validate(length(min = 8, max = 80))]
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ChangePasswordBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    body.validate().map_err(|e| ApiError::bad_request(e.to_string()))?;

    let (password_hash,): (String,) =
        sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&state.db)
            .await?;
    let valid = verify_password(&body.current_password, &password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let new_hash = hash_password(&body.new_password, state.config.bcrypt_cost)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    log_activity(&state.db, Some(user.id), "password_changed", None, None,
        "User changed password")
        .await;

    Ok(Json(ApiResponse::message("Password changed successfully")))
}
