//! Password hashing.

use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("stored password hash is not in PHC format")]
    MalformedHash,
    #[error("hashing task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Plaintext password as received from a client.
///
/// Never printed: `Debug` output is redacted.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash a password into a self-describing (PHC) string.
    fn hash(&self, password: &Password) -> Result<String>;

    /// Check `password` against a hash produced by [`PasswordHasher::hash`].
    ///
    /// Returns `Ok(false)` on mismatch and `Err` when `hash` cannot be parsed.
    fn verify(&self, password: &Password, hash: &str) -> Result<bool>;
}

/// Argon2id hasher.
#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a new [`Argon2Hasher`].
    pub fn new(config: &ArgonConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &Password) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(hash.to_string())
    }

    fn verify(&self, password: &Password, hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|_| CryptoError::MalformedHash)?;

        match self
            .argon2()
            .verify_password(password.as_str().as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CryptoError::Argon2(err.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheap parameters, tests only.
    pub(crate) fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::new(&ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        })
        .expect("valid argon2 parameters")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let password = Password::from("correct horse battery staple");

        let hash = hasher.hash(&password).unwrap();
        assert_ne!(hash, password.as_str());
        assert!(hash.starts_with("$argon2id$"));

        assert!(hasher.verify(&password, &hash).unwrap());
        assert!(!hasher.verify(&Password::from("Tr0ub4dor&3"), &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let password = Password::from("same password");

        let first = hasher.hash(&password).unwrap();
        let second = hasher.hash(&password).unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify(&password, &second).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash() {
        let hasher = fast_hasher();
        let result = hasher.verify(&Password::from("whatever"), "plaintext");
        assert!(matches!(result, Err(CryptoError::MalformedHash)));
    }

    #[test]
    fn test_invalid_params() {
        let config = ArgonConfig {
            memory_cost: 1,
            ..Default::default()
        };
        assert!(matches!(
            Argon2Hasher::new(&config),
            Err(CryptoError::Argon2(_))
        ));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::from("hunter22");
        let debug = format!("{password:?}");
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("REDACTED"));
    }
}
