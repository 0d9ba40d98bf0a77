//! Registration, OTP verification, login, token refresh, and the password
//! recovery chain (OTP, then a short-lived reset token, then the new
//! password).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use hirewire_common::{Error, Role};
use hirewire_domains::users::otp::{EmailOtp, PasswordResetToken};
use hirewire_domains::users::User;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::mailer::send_best_effort;
use crate::{password, AppState};

fn validate_email(email: &str) -> Result<(), Error> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(Error::validation("invalid email address"));
    }
    Ok(())
}

fn send_otp(state: &AppState, email: &str, code: &str) {
    let body = format!("Your verification code is {code}. It expires in 5 minutes.");
    send_best_effort(&*state.mailer, email, "Your verification code", &body);
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    confirm_password: String,
    first_name: String,
    last_name: String,
    role: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_email(&body.email)?;
    password::validate_strength(&body.password)?;
    if body.password != body.confirm_password {
        return Err(Error::validation("passwords do not match").into());
    }
    let role = Role::parse(&body.role)
        .ok_or_else(|| Error::validation("role must be employee, employer, or company"))?;
    if body.first_name.trim().is_empty() {
        return Err(Error::validation("first name is required").into());
    }

    let password_hash = password::hash(&body.password)?;
    let user = User::create(
        &body.email,
        &password_hash,
        &body.first_name,
        &body.last_name,
        role,
        &state.pool,
    )
    .await?;

    let otp = EmailOtp::issue(&user.email, &state.pool).await?;
    send_otp(&state, &user.email, &otp.code);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "detail": "Registration successful. Check your email for the verification code.",
            "email": user.email,
            "otp_expires_in_seconds": hirewire_domains::users::otp::OTP_TTL_SECS,
        })),
    ))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    email: String,
    code: String,
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    EmailOtp::verify_and_consume(&body.email, &body.code, &state.pool).await?;
    User::mark_verified(&body.email, &state.pool).await?;
    Ok(super::detail("Email verified. You can now log in."))
}

#[derive(Deserialize)]
pub struct EmailRequest {
    email: String,
}

pub async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    // The response never reveals whether the account exists.
    if let Some(user) = User::find_by_email(&body.email, &state.pool).await? {
        if !user.email_verified {
            let otp = EmailOtp::issue(&user.email, &state.pool).await?;
            send_otp(&state, &user.email, &otp.code);
        }
    }
    Ok(super::detail(
        "If the account exists, a verification code has been sent.",
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_email(&body.email, &state.pool)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    if !password::verify(&body.password, &user.password_hash) {
        return Err(Error::InvalidCredentials.into());
    }
    if !user.email_verified {
        return Err(Error::EmailNotVerified.into());
    }

    let tokens = state
        .jwt
        .issue_pair(user.id, &user.role)
        .map_err(|_| Error::InvalidToken)?;

    Ok(Json(serde_json::json!({
        "detail": "Login successful.",
        "access": tokens.access,
        "refresh": tokens.refresh,
        "user": user,
    })))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh: String,
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = state
        .jwt
        .verify_refresh(&body.refresh)
        .map_err(|_| Error::InvalidToken)?;

    let user = User::find_by_id(user_id, &state.pool)
        .await?
        .filter(|u| u.is_active)
        .ok_or(Error::InvalidToken)?;

    let tokens = state
        .jwt
        .issue_pair(user.id, &user.role)
        .map_err(|_| Error::InvalidToken)?;

    Ok(Json(serde_json::json!({
        "access": tokens.access,
        "refresh": tokens.refresh,
    })))
}

pub async fn forgot_password_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_email(&body.email, &state.pool)
        .await?
        .ok_or(Error::NotFound("user"))?;

    let otp = EmailOtp::issue(&user.email, &state.pool).await?;
    let message = format!(
        "Your password reset code is {}. It expires in 5 minutes.",
        otp.code
    );
    send_best_effort(&*state.mailer, &user.email, "Password reset code", &message);
    Ok(super::detail("Password reset code sent."))
}

#[derive(Deserialize)]
pub struct VerifyResetRequest {
    email: String,
    code: String,
}

pub async fn forgot_password_verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyResetRequest>,
) -> ApiResult<impl IntoResponse> {
    EmailOtp::verify_and_consume(&body.email, &body.code, &state.pool).await?;
    let user = User::find_by_email(&body.email, &state.pool)
        .await?
        .ok_or(Error::NotFound("user"))?;

    let token = PasswordResetToken::issue(user.id, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Code verified.",
        "reset_token": token.token,
    })))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    reset_token: String,
    new_password: String,
}

pub async fn forgot_password_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    password::validate_strength(&body.new_password)?;
    let user_id = PasswordResetToken::consume(&body.reset_token, &state.pool).await?;
    let password_hash = password::hash(&body.new_password)?;
    User::set_password(user_id, &password_hash, &state.pool).await?;
    Ok(super::detail("Password has been reset."))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    if !password::verify(&body.old_password, &user.password_hash) {
        return Err(Error::InvalidCredentials.into());
    }
    password::validate_strength(&body.new_password)?;

    let password_hash = password::hash(&body.new_password)?;
    User::set_password(user.id, &password_hash, &state.pool).await?;
    Ok(super::detail("Password changed."))
}

pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user@sub.example.co").is_ok());
        assert!(validate_email("userexample.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }
}
