use axum::{Extension, Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::guard::CurrentUser;
use super::types::{
    AdminResetRequest, ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, RegisterResponse,
};
use super::{ApiError, AppState};
use crate::db::Store;

/// POST /register
/// Create a new user account. Open to unauthenticated callers.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if payload.login.is_empty() {
        return Err(ApiError::bad_request("Login is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let user = match state
        .store()
        .create_user(
            &payload.login,
            &payload.password,
            payload.display_name.as_deref(),
        )
        .await
    {
        Ok(user) => user,
        Err(e) if Store::is_unique_violation(&e) => {
            return Err(ApiError::conflict("Login is already taken"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("Registered user: {} (id {})", user.login, user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".to_string(),
            user_id: user.id,
        }),
    ))
}

/// POST /login
/// Verify credentials and issue a session token. An unknown login and a
/// wrong password both answer `Unauthorized` so callers cannot probe
/// which logins exist.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.login.is_empty() {
        return Err(ApiError::bad_request("Login is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let user = state
        .store()
        .verify_user_credentials(&payload.login, &payload.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid login or password"))?;

    let token = state.token_keys().issue(user.id, &user.login).map_err(|e| {
        tracing::error!(error = %e, "Token issue failed");
        ApiError::internal("Failed to issue session token")
    })?;

    let name = user.display_name.as_deref().unwrap_or(&user.login);
    tracing::info!("User logged in: {}", user.login);

    Ok(Json(LoginResponse {
        message: format!("Welcome, {name}!"),
        token,
    }))
}

/// POST /change-password
/// Change the authenticated caller's own password after re-verifying
/// the old one.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.old_password.is_empty() {
        return Err(ApiError::bad_request("Old password is required"));
    }
    if payload.new_password.is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let old_matches = state
        .store()
        .verify_user_password_by_id(current.id, &payload.old_password)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !old_matches {
        return Err(ApiError::unauthorized("Old password is incorrect"));
    }

    let updated = state
        .store()
        .set_user_password_by_id(current.id, &payload.new_password)
        .await?;
    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!("Password changed for user: {}", current.login);

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

/// POST /admin/reset-password
/// Overwrite a user's password without knowing the old one. Gated by
/// the admin key middleware, not by a session token.
pub async fn admin_reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.login.is_empty() {
        return Err(ApiError::bad_request("Login is required"));
    }
    if payload.new_password.is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let updated = state
        .store()
        .set_user_password_by_login(&payload.login, &payload.new_password)
        .await?;
    if !updated {
        return Err(ApiError::not_found("No user with that login"));
    }

    tracing::info!("Password reset by admin for user: {}", payload.login);

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}
