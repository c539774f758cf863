// ============================
// secrets-backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification (Argon2id, PHC strings).
//!
//! Both operations are CPU-heavy; callers on the async runtime go through
//! [`hash_password_blocking`] / [`verify_password_blocking`].
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

/// Hash a password with a fresh random salt
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC hash; a malformed hash never verifies
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok()
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_blocking(plain: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_blocking(hash: String, plain: String) -> Result<bool, AppError> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&hash, &plain)).await?)
}
