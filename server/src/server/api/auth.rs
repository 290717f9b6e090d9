//! Login sessions and account maintenance.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::json;

use crate::app::SharedState;
use crate::services::accounts::{AccountError, UserInfo};

use super::{ApiError, ApiResult, bearer_token, err_json, ok_json, require_session};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUsernameRequest {
    pub current_password: String,
    pub new_username: String,
}

fn account_error(e: AccountError) -> ApiError {
    let status = match e {
        AccountError::InvalidCredentials => 401,
        AccountError::UsernameTaken(_) => 409,
        AccountError::InvalidUsername | AccountError::EmptyPassword => 400,
        AccountError::UnknownUser => 404,
    };
    err_json(status, &e.to_string())
}

/// POST /api/auth/login
pub async fn login(State(state): State<SharedState>, Json(body): Json<LoginRequest>) -> ApiResult {
    let (token, user) = state
        .auth()
        .login(&body.username, &body.password)
        .await
        .map_err(account_error)?;
    Ok(ok_json(json!({ "token": token, "user": UserInfo::from(&user) })))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    let token = bearer_token(&headers).ok_or_else(|| err_json(401, "Missing bearer token"))?;
    let existed = state.auth().logout(token).await;
    state.drop_workspace(token).await;
    Ok(ok_json(json!({ "loggedOut": existed })))
}

/// GET /api/auth/me
pub async fn me(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    let (_, user) = require_session(&state, &headers).await?;
    Ok(ok_json(json!({ "user": UserInfo::from(&user) })))
}

/// POST /api/auth/password
pub async fn change_password(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult {
    let (_, user) = require_session(&state, &headers).await?;
    state
        .auth()
        .change_password(user.id, &body.current_password, &body.new_password)
        .map_err(account_error)?;
    tracing::info!(user = %user.username, "Password changed");
    Ok(ok_json(json!({ "success": true })))
}

/// POST /api/auth/username
pub async fn change_username(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<ChangeUsernameRequest>,
) -> ApiResult {
    let (token, user) = require_session(&state, &headers).await?;
    state
        .auth()
        .rename(user.id, &body.current_password, &body.new_username)
        .map_err(account_error)?;
    let updated = state
        .auth()
        .resolve(&token)
        .await
        .ok_or_else(|| err_json(401, "Invalid or expired session"))?;
    Ok(ok_json(json!({ "user": UserInfo::from(&updated) })))
}
