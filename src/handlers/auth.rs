use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiJson;
use crate::database::models::{User, UserDetails, UserInput};
use crate::middleware::auth::{logout_cookie, session_cookie};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(alias = "newPassword")]
    pub new_password: Option<String>,
}

fn token_response(state: &AppState, token: String) -> ApiResponse<()> {
    let security = &state.config.security;
    let cookie = session_cookie(&token, security.jwt_cookie_expire_days, security.secure_cookies);
    ApiResponse::token(token, cookie)
}

/// POST /api/v1/auth/register - Create an account and start a session
pub async fn register(State(state): State<AppState>, ApiJson(input): ApiJson<UserInput>) -> ApiResult<()> {
    let (_, token) = AuthService::new(&state).register(input).await?;
    Ok(token_response(&state, token))
}

/// POST /api/v1/auth/login - Exchange credentials for a session token
pub async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> ApiResult<()> {
    let (_, token) = AuthService::new(&state)
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;
    Ok(token_response(&state, token))
}

/// GET /api/v1/auth/logout - Replace the session cookie with an expiring one
pub async fn logout() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({})).with_cookie(logout_cookie()))
}

/// GET /api/v1/auth/me - The authenticated user
pub async fn me(user: CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::success(user.0))
}

/// PUT /api/v1/auth/updatedetails - Change own name or email
pub async fn update_details(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(details): ApiJson<UserDetails>,
) -> ApiResult<User> {
    let updated = AuthService::new(&state).update_details(&user.0, details).await?;
    Ok(ApiResponse::success(updated))
}

/// PUT /api/v1/auth/updatepassword - Change own password given the current one
pub async fn update_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> ApiResult<()> {
    let token = AuthService::new(&state)
        .update_password(&user.0, body.current_password.as_deref(), body.new_password.as_deref())
        .await?;
    Ok(token_response(&state, token))
}

/// POST /api/v1/auth/forgotpassword - Email a password reset link
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<&'static str> {
    AuthService::new(&state).forgot_password(body.email.as_deref()).await?;
    Ok(ApiResponse::success("Email sent"))
}

/// PUT /api/v1/auth/resetpassword/:resettoken - Set a new password with a reset token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> ApiResult<()> {
    let (_, token) = AuthService::new(&state)
        .reset_password(&reset_token, body.password.as_deref())
        .await?;
    Ok(token_response(&state, token))
}
