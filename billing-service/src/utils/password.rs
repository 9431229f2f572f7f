use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use service_core::error::AppError;

/// Hash a password using Argon2id with a freshly generated salt.
///
/// The salt is embedded in the returned hash string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(true)` on a match; a mismatch is `Ok(false)`, not an error.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Invalid password hash format: {}", e))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2_hash() {
        let hash = hash_password("correct horse battery staple").unwrap();

        assert!(!hash.is_empty());
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();

        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let hash1 = hash_password("correct horse battery staple").unwrap();
        let hash2 = hash_password("correct horse battery staple").unwrap();

        // Random salt makes each hash unique.
        assert_ne!(hash1, hash2);
        assert!(verify_password("correct horse battery staple", &hash1).unwrap());
        assert!(verify_password("correct horse battery staple", &hash2).unwrap());
    }
}
