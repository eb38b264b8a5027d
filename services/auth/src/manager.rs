//! Composed identity flows over one record store

use chrono::Duration;
use common::{DatabaseConfig, init_pool};
use tracing::{info, warn};

use crate::{
    error::{AuthError, AuthResult},
    models::{Session, User},
    password::CredentialHasher,
    repositories::UserRepository,
    session::{Clock, SessionManager},
    settings::AuthSettings,
    store::RecordStore,
};

/// Entry point a host service holds on to
#[derive(Clone)]
pub struct AuthManager {
    users: UserRepository,
    sessions: SessionManager,
    session_ttl: Duration,
}

impl AuthManager {
    /// Build the manager over an existing store
    pub fn new(store: RecordStore, settings: &AuthSettings) -> AuthResult<Self> {
        let sessions = SessionManager::new(store.clone());
        Self::assemble(store, sessions, settings)
    }

    /// Build the manager with an explicit time source for session expiry
    pub fn with_clock(
        store: RecordStore,
        settings: &AuthSettings,
        clock: Clock,
    ) -> AuthResult<Self> {
        let sessions = SessionManager::with_clock(store.clone(), clock);
        Self::assemble(store, sessions, settings)
    }

    fn assemble(
        store: RecordStore,
        sessions: SessionManager,
        settings: &AuthSettings,
    ) -> AuthResult<Self> {
        let session_ttl = settings.session_ttl();
        if session_ttl <= Duration::zero() {
            return Err(AuthError::Configuration(format!(
                "Session lifetime must be positive, got {} seconds",
                settings.session_ttl_secs
            )));
        }

        let hasher = CredentialHasher::new(settings.hasher_config()).map_err(|e| {
            AuthError::Configuration(format!("Invalid credential hashing cost: {}", e))
        })?;

        Ok(Self {
            users: UserRepository::new(store, hasher),
            sessions,
            session_ttl,
        })
    }

    /// Resolve the database configuration into a pool and build the manager
    ///
    /// Any configuration or connection problem surfaces here, before the
    /// first request is served.
    pub async fn connect(database: &DatabaseConfig, settings: &AuthSettings) -> AuthResult<Self> {
        info!("Connecting identity store ({})", database.backend);
        let pool = init_pool(database).await?;
        Self::new(RecordStore::new(pool), settings)
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Verify credentials and open a session for the user
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> AuthResult<(User, Session)> {
        let user = self.users.verify_credentials(username, password).await?;
        let session = self
            .sessions
            .create_session(user.id, ip_address, user_agent, self.session_ttl)
            .await?;

        info!(user_id = user.id, "User logged in: {}", user.username);
        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        self.sessions.revoke_session(token).await
    }

    /// Resolve a bearer token to its live session and active owner
    pub async fn current_user(&self, token: &str) -> AuthResult<(Session, User)> {
        let session = self.sessions.get_session_by_token(token).await?;

        let user = match self.users.get_user_by_id(session.user_id).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(AuthError::UserNotFound) => {
                warn!(session_id = session.id, "Session owner is no longer active");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(e),
        };

        Ok((session, user))
    }
}
