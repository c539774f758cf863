// ============================
// secrets-backend-lib/src/auth/local.rs
// ============================
//! Local (username + password) strategy.
use secrets_common::{CredentialsForm, User, UserKey};

use super::password::{hash_password_blocking, verify_password_blocking};
use crate::error::AppError;
use crate::storage::Storage;

fn check_form(form: &CredentialsForm) -> Result<(), AppError> {
    if form.username.trim().is_empty() {
        return Err(AppError::InvalidInput("username must not be empty".to_string()));
    }
    if form.password.is_empty() {
        return Err(AppError::InvalidInput("password must not be empty".to_string()));
    }
    Ok(())
}

/// Create a local account with a salted password hash
pub async fn register<S: Storage + ?Sized>(
    storage: &S,
    form: &CredentialsForm,
) -> Result<User, AppError> {
    check_form(form)?;

    let key = UserKey::Local(form.username.clone());
    // cheap early exit; create_user re-checks under the store lock
    if storage.find_user(&key).await?.is_some() {
        return Err(AppError::DuplicateUsername(form.username.clone()));
    }

    let mut user = User::from_key(&key);
    user.password_hash = Some(hash_password_blocking(form.password.clone()).await?);
    storage.create_user(user).await
}

/// Verify a username/password pair.
///
/// Unknown users, accounts without a password and wrong passwords all yield
/// [`AppError::InvalidCredentials`].
pub async fn authenticate<S: Storage + ?Sized>(
    storage: &S,
    form: &CredentialsForm,
) -> Result<User, AppError> {
    check_form(form).map_err(|_| AppError::InvalidCredentials)?;

    let user = storage
        .find_user(&UserKey::Local(form.username.clone()))
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    let hash = user
        .password_hash
        .clone()
        .ok_or(AppError::InvalidCredentials)?;

    if verify_password_blocking(hash, form.password.clone()).await? {
        Ok(user)
    } else {
        Err(AppError::InvalidCredentials)
    }
}
