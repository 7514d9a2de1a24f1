use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{AppError, AppResult};

/// Argon2id with the crate's default cost. Hashes are PHC strings, so the
/// salt and parameters travel with each stored hash.
#[derive(Clone, Default)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn hash(&self, plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| AppError::Internal(anyhow!("argon2 hash: {e}")))
    }

    /// `Ok(false)` on mismatch. A stored value that is not a PHC string is
    /// an internal error, not a failed login.
    pub fn verify(&self, plain: &str, stored: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| AppError::Internal(anyhow!("stored password hash: {e}")))?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(anyhow!("argon2 verify: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_original_password() {
        let hasher = CredentialHasher::default();
        let stored = hasher.hash("correct-horse").unwrap();
        assert!(hasher.verify("correct-horse", &stored).unwrap());
        assert!(!hasher.verify("wrong-horse", &stored).unwrap());
    }

    #[test]
    fn each_hash_is_salted_argon2id() {
        let hasher = CredentialHasher::default();
        let a = hasher.hash("password123").unwrap();
        let b = hasher.hash("password123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn corrupt_stored_hash_is_internal() {
        let hasher = CredentialHasher::default();
        assert!(matches!(
            hasher.verify("anything", "plaintext-in-db"),
            Err(AppError::Internal(_))
        ));
    }
}
