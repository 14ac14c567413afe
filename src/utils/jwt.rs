use crate::error::{AppError, BusinessError, MapToAppError};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub exp: i64,
}

pub fn encode(secret: &str, claims: &Claims) -> Result<String, AppError> {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_to_internal()
}

pub fn decode(secret: &str, token: &str) -> Result<Claims, AppError> {
    Ok(jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("token rejected: {e}");
        BusinessError::Unauthorized("invalid token".to_string())
    })?
    .claims)
}

pub fn gen_token(lifetime_secs: i64, secret: &str, sub: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (Utc::now() + Duration::seconds(lifetime_secs)).timestamp(),
    };
    encode(secret, &claims)
}
