// src/utils/hash.rs

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Hash checked when the account does not exist, so both login failures cost the same.
fn dummy_hash() -> Result<&'static str, AppError> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password("acctbot-dummy-password")?;
    Ok(DUMMY.get_or_init(|| hash).as_str())
}

/// Verifies `password` against a stored hash.
///
/// With no stored hash (unknown account) a dummy hash is verified instead and
/// the result is always `false`.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> Result<bool, AppError> {
    let (candidate, known) = match stored_hash {
        Some(hash) => (hash, true),
        None => (dummy_hash()?, false),
    };

    let parsed_hash =
        PasswordHash::new(candidate).map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let matches = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();

    Ok(known && matches)
}
