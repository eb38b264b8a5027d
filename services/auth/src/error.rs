//! Error taxonomy for the identity core
//!
//! Domain conditions (absence, conflicts, rejected credentials or tokens) are
//! variants callers are expected to match on. Anything the store reports that
//! is not one of those is carried unchanged in [`AuthError::Store`].

use common::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserExists,

    /// Unknown username and wrong password both surface as this variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("credential hashing failed: {0}")]
    HashingFailure(String),

    #[error("user metadata is corrupt: {0}")]
    MetadataCorrupt(#[source] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::HashingFailure(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
