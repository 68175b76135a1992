//! Account and recovery endpoints.
//!
//! Registration and login issue session tokens directly. Password recovery is
//! a three-step flow: `request-otp` emails a one-time code, `verify-otp`
//! exchanges the code for a short-lived reset token, and `reset-password`
//! exchanges the reset token for a new password. Each step invalidates the
//! artifact of the previous one.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};
use sunleaf_core::{UserId, UserRole};

use crate::error::AppError;
use crate::services::auth::{AuthService, RegisterParams};
use crate::state::AppState;

/// Build the account and recovery router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/request-otp", post(request_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/reset-password", post(reset_password))
}

/// Collapse an absent or empty field into the endpoint's validation error.
fn require<'a>(value: Option<&'a String>, message: &str) -> Result<&'a str, AppError> {
    match value.map(String::as_str) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

/// Request to register a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

/// Response after a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// Register a new account.
///
/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    const REQUIRED: &str = "Name, email, username, password, phone, and role are required";

    let params = RegisterParams {
        name: require(req.name.as_ref(), REQUIRED)?,
        email: require(req.email.as_ref(), REQUIRED)?,
        username: require(req.username.as_ref(), REQUIRED)?,
        password: require(req.password.as_ref(), REQUIRED)?,
        phone: require(req.phone.as_ref(), REQUIRED)?,
        role: require(req.role.as_ref(), REQUIRED)?,
    };

    let auth = AuthService::new(state.pool(), state.tokens(), state.notifier());
    auth.register(params).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Request to log in with username and password.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Session payload returned after a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: UserRole,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// Authenticate and issue a session token.
///
/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    const REQUIRED: &str = "Username and password are required";

    let username = require(req.username.as_ref(), REQUIRED)?;
    let password = require(req.password.as_ref(), REQUIRED)?;

    let auth = AuthService::new(state.pool(), state.tokens(), state.notifier());
    let (token, user) = auth.login(username, password).await?;

    Ok(Json(LoginResponse {
        token,
        role: user.role,
        user_id: user.id,
        name: user.name,
        email: user.email.into_inner(),
    }))
}

/// Request to start a password reset.
#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    /// Username or email of the account.
    pub identifier: Option<String>,
}

/// Response after a one-time code has been sent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    pub success: bool,
    pub message: String,
    pub masked_email: String,
}

/// Send a one-time code to the account's email.
///
/// POST /api/auth/request-otp
async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpRequest>,
) -> Result<Json<OtpSentResponse>, AppError> {
    const REQUIRED: &str = "Username or email is required";

    let identifier = require(req.identifier.as_ref(), REQUIRED)?.trim();
    if identifier.is_empty() {
        return Err(AppError::Validation(REQUIRED.to_string()));
    }

    let auth = AuthService::new(state.pool(), state.tokens(), state.notifier());
    let masked_email = auth.request_reset(identifier).await?;

    Ok(Json(OtpSentResponse {
        success: true,
        message: "OTP sent to your registered email address".to_string(),
        masked_email,
    }))
}

/// Request to verify a one-time code.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    /// Username or email of the account.
    pub identifier: Option<String>,
    pub otp: Option<String>,
}

/// Response after a one-time code has been verified.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifiedResponse {
    pub success: bool,
    pub message: String,
    pub reset_token: String,
}

/// Verify a one-time code and issue a reset token.
///
/// POST /api/auth/verify-otp
async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<OtpVerifiedResponse>, AppError> {
    const REQUIRED: &str = "Identifier and OTP are required";

    let identifier = require(req.identifier.as_ref(), REQUIRED)?.trim();
    let otp = require(req.otp.as_ref(), REQUIRED)?;

    let auth = AuthService::new(state.pool(), state.tokens(), state.notifier());
    let reset_token = auth.verify_code(identifier, otp).await?;

    Ok(Json(OtpVerifiedResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        reset_token,
    }))
}

/// Request to complete a password reset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub reset_token: Option<String>,
    pub new_password: Option<String>,
}

/// Response after a completed password reset.
#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub success: bool,
    pub message: String,
}

/// Set a new password using a verified reset token.
///
/// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    const REQUIRED: &str = "Reset token and new password are required";

    let reset_token = require(req.reset_token.as_ref(), REQUIRED)?;
    let new_password = require(req.new_password.as_ref(), REQUIRED)?;

    let auth = AuthService::new(state.pool(), state.tokens(), state.notifier());
    auth.reset_password(reset_token, new_password).await?;

    Ok(Json(ResetPasswordResponse {
        success: true,
        message: "Password reset successfully. You can now login with your new password."
            .to_string(),
    }))
}
