use axum::{Json, extract::State};
use std::sync::Arc;

use super::validation::{self, AppPath};
use super::{ApiError, ApiResponse, AppState};
use crate::services::UserInfo;

/// GET /users/{id}
/// Look up a user by id (requires authentication)
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let id = validation::validate_user_id(id)?;

    let user = state.auth().get_user(id).await?;

    Ok(Json(ApiResponse::success(user)))
}
