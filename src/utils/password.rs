use crate::error::{AppError, InternalError, MapToAppError};
use rand::RngCore;

/// Work factor bounds accepted by bcrypt.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

pub fn hash_password(cost: u32, salt: &str, password: &str) -> Result<String, AppError> {
    let salt: [u8; 16] = salt
        .as_bytes()
        .try_into()
        .map_err(|_| InternalError::Others(format!("salt must be 16 bytes, got {}", salt.len())))?;
    Ok(bcrypt::hash_with_salt(password, cost, salt)
        .map_to_internal()?
        .to_string())
}

fn gen_random_string(size: usize) -> String {
    let mut rand = rand::rng();
    let mut dest = vec![0; size / 2];

    rand.fill_bytes(&mut dest);
    hex::encode(dest)
}

/// A fresh 16-character salt, as bcrypt expects 16 bytes.
pub fn gen_salt() -> String {
    gen_random_string(16)
}

pub fn check_password(
    cost: u32,
    salt: &str,
    expected: &str,
    actual: &str,
) -> Result<bool, AppError> {
    Ok(hash_password(cost, salt, actual)? == expected)
}
