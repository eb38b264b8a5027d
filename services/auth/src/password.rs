//! Credential hashing with argon2id
//!
//! Hashes are PHC strings: algorithm, cost parameters and salt travel inside
//! the stored value, so verification needs nothing but the hash itself.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString},
};
use rand::rngs::OsRng;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

use crate::error::{AuthError, AuthResult};

/// Tunable argon2id cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes over memory
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// One-way salted credential hasher
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    decoy: Arc<OnceLock<Option<String>>>,
}

impl CredentialHasher {
    /// Build a hasher with the given cost
    pub fn new(config: HasherConfig) -> AuthResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::HashingFailure(format!("invalid argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy: Arc::new(OnceLock::new()),
        })
    }

    /// Hash a plaintext secret with a freshly generated salt
    pub fn hash(&self, secret: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2.hash_password(secret.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext secret against a stored hash
    ///
    /// A mismatch is `Ok(false)`. Only a stored value that is not a valid PHC
    /// string is an error.
    pub fn verify(&self, secret: &str, hashed: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hashed)?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Spend the same work as a real verification and discard the result.
    ///
    /// Used when there is no stored hash to check against, so that an unknown
    /// username costs as much as a wrong password.
    pub(crate) fn verify_decoy(&self, secret: &str) {
        let decoy = self
            .decoy
            .get_or_init(|| self.hash("authkit-decoy-credential").ok());

        if let Some(decoy) = decoy {
            let _ = self.verify(secret, decoy);
        }
    }
}
