use std::sync::Arc;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejection;
use uuid::Uuid;
use crate::error::{AppError, BusinessError};
use crate::utils::jwt::decode;
use crate::utils::state::AppState;

/// The authenticated caller, attached to the request by [`authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let TypedHeader(auth) =
        bearer.map_err(|_| BusinessError::Unauthorized("No token provided".to_string()))?;
    let claims = decode(&state.config.jwt_secret, auth.token())?;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| BusinessError::Unauthorized("invalid token".to_string()))?;
    req.extensions_mut().insert(CurrentUser { id });
    Ok(next.run(req).await)
}
