//! Settings for the identity core

use chrono::Duration;
use config::{Config, Environment};
use serde::Deserialize;

use crate::{error::AuthResult, password::HasherConfig};

/// Credential cost and session lifetime
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    /// Argon2 passes over memory
    pub hash_iterations: u32,
    /// Argon2 lanes
    pub hash_parallelism: u32,
    /// Lifetime of a session issued at login, in seconds
    pub session_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let hasher = HasherConfig::default();
        Self {
            hash_memory_kib: hasher.memory_kib,
            hash_iterations: hasher.iterations,
            hash_parallelism: hasher.parallelism,
            session_ttl_secs: 86_400, // 1 day
        }
    }
}

impl AuthSettings {
    /// Load settings from environment variables
    ///
    /// # Environment Variables
    /// - `AUTHKIT_HASH_MEMORY_KIB`: argon2 memory cost (default: 19456)
    /// - `AUTHKIT_HASH_ITERATIONS`: argon2 iterations (default: 2)
    /// - `AUTHKIT_HASH_PARALLELISM`: argon2 parallelism (default: 1)
    /// - `AUTHKIT_SESSION_TTL_SECS`: session lifetime in seconds (default: 86400)
    pub fn from_env() -> AuthResult<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix("AUTHKIT"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn hasher_config(&self) -> HasherConfig {
        HasherConfig {
            memory_kib: self.hash_memory_kib,
            iterations: self.hash_iterations,
            parallelism: self.hash_parallelism,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs)
    }
}
