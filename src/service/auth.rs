use crate::domain::user::User;
use crate::error::{AppError, BusinessError, MapToAppError};
use crate::utils::jwt::gen_token;
use crate::utils::password::{check_password, gen_salt, hash_password};
use crate::utils::state::AppState;
use crate::utils::validation::is_valid_username;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CredentialsReq {
    username: Option<String>,
    password: Option<String>,
}

impl CredentialsReq {
    fn into_parts(self) -> Result<(String, String), AppError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(BusinessError::BadRequest(
                "username and password are required".to_string(),
            )
            .into()),
        }
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let (username, password) = req.into_parts()?;
    if !is_valid_username(&username) {
        return Err(BusinessError::BadRequest(
            "username must be 3-32 characters of letters, digits, `.`, `_` or `-`".to_string(),
        )
        .into());
    }
    if state.user_storage.query_user_by_name(&username).await?.is_some() {
        return Err(BusinessError::Conflict("user already exists".to_string()).into());
    }

    let salt = gen_salt();
    let hashed = {
        let (cost, salt) = (state.config.bcrypt_cost, salt.clone());
        // Hashing is slow, so it runs on the blocking pool.
        tokio::task::spawn_blocking(move || hash_password(cost, &salt, &password))
            .await
            .map_to_internal()??
    };
    state.user_storage.create_user(User::new(&username, hashed, salt)).await?;

    tracing::info!(%username, "registered user");
    Ok((StatusCode::CREATED, Json(json!({ "message": "Registered successfully" }))))
}

#[derive(Serialize)]
pub struct LoginRes {
    id: Uuid,
    username: String,
    token: String,
    expires_in: i64,
    issued_at: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsReq>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::from(BusinessError::Unauthorized("invalid credentials".to_string()));
    let (username, password) = req.into_parts()?;

    let user = state
        .user_storage
        .query_user_by_name(&username)
        .await?
        .ok_or_else(invalid)?;
    let matches = {
        let (cost, salt, expected) = (
            state.config.bcrypt_cost,
            user.salt.clone(),
            user.password.clone(),
        );
        tokio::task::spawn_blocking(move || check_password(cost, &salt, &expected, &password))
            .await
            .map_to_internal()??
    };
    if !matches {
        return Err(invalid());
    }

    let token = gen_token(
        state.config.jwt_lifetime_secs,
        &state.config.jwt_secret,
        &user.id.to_string(),
    )?;
    Ok(Json(LoginRes {
        id: user.id,
        username: user.username,
        token,
        expires_in: state.config.jwt_lifetime_secs,
        issued_at: Utc::now().to_rfc3339(),
    }))
}
