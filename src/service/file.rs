use crate::api::middleware::CurrentUser;
use crate::domain::record::Record;
use crate::error::{AppError, BusinessError};
use crate::utils::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RecordReq {
    filename: Option<String>,
    content: Option<String>,
}

fn not_found() -> AppError {
    BusinessError::NotFound("File not found".to_string()).into()
}

pub async fn create_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<RecordReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let filename = req
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| BusinessError::BadRequest("filename is required".to_string()))?;
    let record = Record::new(user.id, filename, req.content.unwrap_or_default());
    state.record_storage.create_record(&record).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.record_storage.list_records(&user.id).await?))
}

/// Empty or absent fields keep their stored value.
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<RecordReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let mut record = state
        .record_storage
        .query_record(&user.id, &id)
        .await?
        .ok_or_else(not_found)?;
    if let Some(filename) = req.filename.filter(|s| !s.is_empty()) {
        record.filename = filename;
    }
    if let Some(content) = req.content.filter(|s| !s.is_empty()) {
        record.content = content;
    }
    record.updated_at = Utc::now();

    if !state.record_storage.update_record(&record).await? {
        return Err(not_found());
    }
    Ok(Json(record))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if !state.record_storage.delete_record(&user.id, &id).await? {
        return Err(not_found());
    }
    Ok(Json(json!({ "message": "File deleted successfully" })))
}
