use crate::api::middleware::CurrentUser;
use crate::domain::entry::EntryKind;
use crate::error::{AppError, BusinessError};
use crate::storage::paths::{RelPath, ResolvedPath};
use crate::storage::{NodeKind, Removed};
use crate::utils::state::AppState;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    path: Option<String>,
    recursive: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemReq {
    path: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReq {
    source_path: Option<String>,
    destination_path: Option<String>,
    #[serde(default)]
    recursive: bool,
}

fn bad_request(message: &str) -> AppError {
    BusinessError::BadRequest(message.to_string()).into()
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

/// Resolves a path that is about to be mutated. The user root itself cannot be.
fn mutable_target(
    state: &AppState,
    user: &CurrentUser,
    raw: &str,
) -> Result<ResolvedPath, AppError> {
    let target = state.resolver.resolve(&user.id, raw);
    if target.key.is_root() {
        return Err(bad_request("Operation on the root directory is not allowed"));
    }
    Ok(target)
}

fn transfer_targets(
    state: &AppState,
    user: &CurrentUser,
    req: TransferReq,
) -> Result<(ResolvedPath, ResolvedPath, bool), AppError> {
    let (Some(src), Some(dst)) = (
        non_blank(req.source_path),
        non_blank(req.destination_path),
    ) else {
        return Err(bad_request("sourcePath and destinationPath are required"));
    };
    let src = mutable_target(state, user, &src)?;
    let dst = mutable_target(state, user, &dst)?;
    check_transfer(&src.key, &dst.key)?;
    Ok((src, dst, req.recursive))
}

fn check_transfer(src: &RelPath, dst: &RelPath) -> Result<(), AppError> {
    if src == dst {
        return Err(bad_request("sourcePath and destinationPath must differ"));
    }
    if dst.starts_with(src) {
        return Err(bad_request("destinationPath cannot be inside sourcePath"));
    }
    if src.starts_with(dst) {
        return Err(bad_request("destinationPath cannot be an ancestor of sourcePath"));
    }
    Ok(())
}

pub async fn list_directory(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Query(query), _): WithRejection<Query<PathQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    state.storage.ensure_dir(&state.resolver.user_root(&user.id)).await?;
    let target = state
        .resolver
        .resolve(&user.id, query.path.as_deref().unwrap_or("."));
    let listed = state.storage.list(&target.disk).await?;
    Ok(Json(listed))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateItemReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let kind = match req.kind.as_deref() {
        Some("file") => Some(NodeKind::File),
        Some("dir") => Some(NodeKind::Directory),
        _ => None,
    };
    let (Some(raw), Some(kind)) = (non_blank(req.path), kind) else {
        return Err(bad_request("Invalid path or type (file/dir)"));
    };
    let target = mutable_target(&state, &user, &raw)?;

    state.storage.create(&target.disk, kind).await?;
    let (entry_kind, message) = match kind {
        NodeKind::File => (EntryKind::File, "File successfully created"),
        NodeKind::Directory => (EntryKind::Folder, "Folder successfully created"),
    };
    state.sync.record_create(user.id, &target.key, entry_kind).await?;

    tracing::info!(owner = %user.id, path = %target.key, "created {}", entry_kind.as_str());
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

pub async fn view_file_content(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Query(query), _): WithRejection<Query<PathQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let raw = non_blank(query.path)
        .ok_or_else(|| bad_request("Please provide the path query parameter"))?;
    let target = state.resolver.resolve(&user.id, &raw);
    let file = state.storage.open(&target.disk).await?;
    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(ReaderStream::new(file)),
    ))
}

pub async fn delete_path(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Query(query), _): WithRejection<Query<DeleteQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let raw = non_blank(query.path)
        .ok_or_else(|| bad_request("Path query parameter is required"))?;
    let recursive = query.recursive.as_deref() == Some("true");
    let target = mutable_target(&state, &user, &raw)?;

    let removed = state.storage.delete(&target.disk, recursive).await?;
    let dropped = state.sync.record_delete(user.id, &target.key, removed).await?;

    tracing::info!(owner = %user.id, path = %target.key, dropped, "deleted {removed:?}");
    let message = match removed {
        Removed::File => "File deleted successfully",
        Removed::EmptyDirectory => "Empty directory deleted",
        Removed::Tree => "Directory deleted recursively",
    };
    Ok(Json(json!({ "message": message })))
}

pub async fn copy_path(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<TransferReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let (src, dst, recursive) = transfer_targets(&state, &user, req)?;

    let kind = state.storage.copy(&src.disk, &dst.disk, recursive).await?;
    state.sync.record_copy(user.id, &dst, kind).await?;

    tracing::info!(owner = %user.id, src = %src.key, dst = %dst.key, "copied {kind:?}");
    Ok(Json(json!({ "message": "Copy successful" })))
}

pub async fn move_path(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<TransferReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let (src, dst, recursive) = transfer_targets(&state, &user, req)?;

    let kind = state.storage.move_path(&src.disk, &dst.disk, recursive).await?;
    state.sync.record_move(user.id, &src.key, &dst, kind).await?;

    tracing::info!(owner = %user.id, src = %src.key, dst = %dst.key, "moved {kind:?}");
    Ok(Json(json!({ "message": "Move successful" })))
}
