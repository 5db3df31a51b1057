use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::AppJson;
use super::{ApiError, ApiResponse, AppState};
use crate::services::{LoginOutcome, LoginResult, UserInfo};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Verified token subject, stored in request extensions by
/// `auth_middleware` for downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// Authentication middleware for protected routes.
///
/// Requires `Authorization: Bearer <token>`. Missing credentials,
/// malformed tokens, and expired tokens each produce their own 401
/// message so clients can tell re-login from retry.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Err(ApiError::unauthorized("Missing credentials"));
    };

    let username = state.auth().verify_token(&token).await?;

    tracing::Span::current().record("user_id", &username);
    request
        .extensions_mut()
        .insert(AuthenticatedUser { username });

    Ok(next.run(request).await)
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with username and password; an unknown username
/// registers a new account. Returns a bearer token on success.
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    let username = payload.username.trim().to_string();

    // The allow-list policy sits at the edge; the auth service itself
    // has no opinion on who may register.
    if !username.is_empty() {
        let config = state.config().read().await;
        if !config.username_allowed(&username) {
            return Err(ApiError::forbidden("Username is not allowed to log in"));
        }
    }

    let result = state.auth().login(&username, &payload.password).await?;

    let message = match result.outcome {
        LoginOutcome::Success => "Login successful",
        LoginOutcome::FirstLoginRegistered => "Account created on first login",
    };

    Ok(Json(ApiResponse::success_with_message(result, message)))
}

/// GET /auth/me
/// Get current user information (requires authentication)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let info = state.auth().get_user_by_username(&user.username).await?;

    Ok(Json(ApiResponse::success(info)))
}
