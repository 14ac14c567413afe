use std::io;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Failures caused by the request itself.
#[derive(Error, Debug)]
pub enum BusinessError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

#[derive(Error, Debug)]
pub enum InternalError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Others(String),
}

impl InternalError {
    /// Short, client-facing summary. The cause goes into `details`.
    fn summary(&self) -> &str {
        match self {
            Self::Sqlx(_) | Self::Migration(_) => "database operation failed",
            Self::Bcrypt(_) => "password hashing failed",
            Self::Jwt(_) => "token signing failed",
            Self::Io { context, .. } => context,
            Self::Others(_) => "an internal server error occurred",
        }
    }

    fn details(&self) -> String {
        match self {
            Self::Io { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

pub trait MapToAppError<T> {
    fn map_to_internal(self) -> Result<T, AppError>;
}

impl<T, E: Into<InternalError>> MapToAppError<T> for Result<T, E> {
    fn map_to_internal(self) -> Result<T, AppError> {
        self.map_err(|e| AppError::Internal(e.into()))
    }
}

// Extractor rejections become 400s with the usual JSON body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        BusinessError::BadRequest(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        BusinessError::BadRequest(rejection.body_text()).into()
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        BusinessError::BadRequest(rejection.body_text()).into()
    }
}

impl From<tokio::task::JoinError> for InternalError {
    fn from(e: tokio::task::JoinError) -> Self {
        InternalError::Others(e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, body) = match &self {
            Self::Business(err) => {
                tracing::warn!("rejecting request: {err}");
                let status = match err {
                    BusinessError::BadRequest(_) => StatusCode::BAD_REQUEST,
                    BusinessError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    BusinessError::NotFound(_) => StatusCode::NOT_FOUND,
                    BusinessError::Conflict(_) => StatusCode::CONFLICT,
                };
                (status, ErrorBody { error: err.to_string(), details: None })
            }
            Self::Internal(err) => {
                tracing::error!("Generating response for AppError: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: err.summary().to_string(),
                        details: Some(err.details()),
                    },
                )
            }
        };

        let mut response = (status_code, Json(body)).into_response();
        if status_code == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
