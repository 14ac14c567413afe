pub mod middleware;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::api::middleware::authenticate;
use crate::service::auth::{login, register};
use crate::service::file::{create_file, delete_file, list_files, update_file};
use crate::service::fs::{
    copy_path, create_item, delete_path, list_directory, move_path, view_file_content,
};
use crate::service::user::profile;
use crate::utils::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", auth_router().merge(protected_router(state.clone())))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

fn protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/profile", get(profile))
        .route("/files", post(create_file).get(list_files))
        .route("/files/{id}", put(update_file).delete(delete_file))
        .route("/fs", get(list_directory).post(create_item).delete(delete_path))
        .route("/fs/content", get(view_file_content))
        .route("/fs/copy", post(copy_path))
        .route("/fs/move", post(move_path))
        .route_layer(from_fn_with_state(state, authenticate))
}
