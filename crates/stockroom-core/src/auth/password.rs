use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::StockroomError;

/// Hash a plaintext password using Argon2.
pub fn hash_password(password: &str) -> Result<String, StockroomError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StockroomError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a plaintext password against a stored hash.
///
/// A malformed stored hash is an internal fault, not a wrong password.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, StockroomError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| StockroomError::Internal(format!("Invalid password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
