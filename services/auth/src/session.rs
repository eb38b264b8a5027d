//! Server-side sessions stored next to the users they belong to
//!
//! Expiry is checked on every read against the manager's clock. Expired rows
//! are only removed by an explicit purge.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    error::{AuthError, AuthResult},
    models::{NewSession, Session},
    store::RecordStore,
};

/// Number of alphanumeric characters in a session token (~285 bits)
pub const TOKEN_LENGTH: usize = 48;

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Generate an unguessable session token from the OS random source
pub fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Session manager for issuing, reading and revoking sessions
#[derive(Clone)]
pub struct SessionManager {
    store: RecordStore,
    clock: Clock,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a new session manager on the wall clock
    pub fn new(store: RecordStore) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    pub fn with_clock(store: RecordStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Create a new session for a user, valid for `ttl` from now
    ///
    /// The user is not looked up here; callers establish that it exists.
    pub async fn create_session(
        &self,
        user_id: i64,
        ip_address: &str,
        user_agent: &str,
        ttl: Duration,
    ) -> AuthResult<Session> {
        info!("Creating session for user: {}", user_id);

        if ttl <= Duration::zero() {
            return Err(AuthError::InvalidInput(
                "Session lifetime must be positive".to_string(),
            ));
        }

        let new_session = NewSession {
            user_id,
            token: generate_token(),
            expires_at: self.now() + ttl,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
        };

        let session = self.store.insert_session(&new_session).await?;
        debug!(session_id = session.id, expires_at = %session.expires_at, "Session created");
        Ok(session)
    }

    /// Get a live session by its token
    pub async fn get_session_by_token(&self, token: &str) -> AuthResult<Session> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let session = self
            .store
            .fetch_session_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired_at(self.now()) {
            warn!(session_id = session.id, "Rejected expired session");
            return Err(AuthError::TokenExpired);
        }

        Ok(session)
    }

    /// Revoke a session; revoking an unknown or already revoked token succeeds
    pub async fn revoke_session(&self, token: &str) -> AuthResult<()> {
        let removed = self.store.delete_session_by_token(token).await?;
        debug!("Revoked {} session(s)", removed);
        Ok(())
    }

    /// Revoke every session of a user (logout from all devices)
    pub async fn revoke_user_sessions(&self, user_id: i64) -> AuthResult<u64> {
        info!("Revoking all sessions for user: {}", user_id);
        Ok(self.store.delete_sessions_for_user(user_id).await?)
    }

    /// Delete sessions that have already expired
    pub async fn purge_expired_sessions(&self) -> AuthResult<u64> {
        let purged = self.store.delete_expired_sessions(self.now()).await?;
        info!("Purged {} expired session(s)", purged);
        Ok(purged)
    }
}
