use crate::api::middleware::CurrentUser;
use crate::error::{AppError, BusinessError};
use crate::utils::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;
use std::sync::Arc;

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .user_storage
        .query_user_by_id(&current.id)
        .await?
        .ok_or_else(|| BusinessError::NotFound("user not found".to_string()))?;
    Ok(Json(json!({
        "message": format!("Welcome {}", user.username),
        "id": user.id,
        "username": user.username,
    })))
}
