use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Hash(e.to_string()))
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AppError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash on the blocking thread pool; argon2 is too slow for a worker thread.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    actix_web::web::block(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Hash(e.to_string()))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    actix_web::web::block(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Hash(e.to_string()))?
}
