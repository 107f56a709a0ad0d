//! Password hashing with Argon2id.
//!
//! Hashes are PHC strings carrying the algorithm parameters and a random
//! 16-byte salt, so verification needs no external state. Verification is
//! constant-time within the Argon2 implementation.
//!
//! # Example
//!
//! ```
//! use dealflow_shared::auth::password::{hash_password, verify_password};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("correct horse battery staple")?;
//! assert!(verify_password("correct horse battery staple", &hash)?);
//! assert!(!verify_password("tr0ub4dor&3", &hash)?);
//! # Ok(())
//! # }
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Error type for password hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash the password
    #[error("failed to hash password: {0}")]
    Hash(String),

    /// Stored hash is not a valid PHC string
    #[error("invalid password hash: {0}")]
    InvalidHash(String),

    /// Verification failed for a reason other than a wrong password
    #[error("failed to verify password: {0}")]
    Verify(String),
}

/// Hashes a plaintext password with Argon2id and a fresh random salt.
///
/// Returns the PHC string (`$argon2id$v=19$...`) to store in place of the
/// password. Two hashes of the same password differ because of the salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verifies a plaintext password against a stored PHC hash.
///
/// `Ok(false)` means the password is wrong; `Err` means the stored hash is
/// malformed or verification itself failed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("hunter2").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = hash_password("same").expect("hash");
        let b = hash_password("same").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_correct_and_incorrect() {
        let hash = hash_password("right").expect("hash");
        assert!(verify_password("right", &hash).expect("verify"));
        assert!(!verify_password("wrong", &hash).expect("verify"));
        assert!(!verify_password("", &hash).expect("verify"));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("pw", "not-a-hash").is_err());
        assert!(verify_password("pw", "$argon2id$broken").is_err());
    }
}
