//! Argon2id password hashing.

use crate::{Error, Result};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use credgate_api::{AuthError, PasswordHasher};

/// Argon2id hasher producing PHC strings.
///
/// Verification reads the cost parameters from the stored hash, so hashes created
/// with older settings keep verifying after the parameters change.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Build a hasher with explicit cost parameters.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check `password` against a PHC string in constant time.
    pub fn verify_password(&self, password: &str, phc: &str) -> Result<bool> {
        let parsed = PasswordHash::new(phc)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::from(e)),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> std::result::Result<String, AuthError> {
        self.hash_password(password)
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn matches(&self, password: &str, hash: &str) -> std::result::Result<bool, AuthError> {
        self.verify_password(password, hash)
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::new(256, 1, 1).unwrap()
    }

    #[test]
    fn hash_then_match() {
        let hasher = cheap();
        let phc = hasher.hash("secret").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(hasher.matches("secret", &phc).unwrap());
        assert!(!hasher.matches("wrong", &phc).unwrap());
    }

    #[test]
    fn salts_differ() {
        let hasher = cheap();
        assert_ne!(hasher.hash("secret").unwrap(), hasher.hash("secret").unwrap());
    }

    #[test]
    fn params_come_from_the_stored_hash() {
        let phc = cheap().hash("secret").unwrap();
        let stronger = Argon2Hasher::new(512, 2, 1).unwrap();
        assert!(stronger.matches("secret", &phc).unwrap());
    }

    #[test]
    fn malformed_hash_is_not_a_mismatch() {
        let err = cheap().matches("secret", "plaintext-in-db").unwrap_err();
        assert!(matches!(err, AuthError::Hashing(_)));
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(matches!(
            Argon2Hasher::new(1, 1, 1),
            Err(Error::PasswordHash(_))
        ));
    }
}
