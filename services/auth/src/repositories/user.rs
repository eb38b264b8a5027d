//! User repository for account creation, lookup and credential checks

use tracing::{debug, error, info, warn};

use crate::{
    error::{AuthError, AuthResult},
    metadata::{self, Metadata},
    models::{NewUser, User},
    password::CredentialHasher,
    store::RecordStore,
    validation::{validate_email, validate_password, validate_username},
};

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    store: RecordStore,
    hasher: CredentialHasher,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(store: RecordStore, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    /// Create a new active user with empty metadata
    ///
    /// Username uniqueness is enforced by the store; a collision is reported
    /// as [`AuthError::UserExists`].
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<User> {
        info!("Creating new user: {}", username);

        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let password_hash = self.hasher.hash(password).map_err(|e| {
            error!("Failed to hash credential for {}: {}", username, e);
            e
        })?;

        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        };
        let metadata = metadata::encode(None)?;

        let row = self
            .store
            .insert_user(&new_user, &metadata)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    warn!("Username already taken: {}", username);
                    AuthError::UserExists
                } else {
                    AuthError::Store(e)
                }
            })?;

        let user = User::try_from(row)?;
        info!(user_id = user.id, "Created user: {}", user.username);
        Ok(user)
    }

    /// Find an active user by exact username
    pub async fn get_user_by_username(&self, username: &str) -> AuthResult<User> {
        debug!("Finding active user by username: {}", username);

        match self.store.fetch_active_user_by_username(username).await? {
            Some(row) => User::try_from(row),
            None => Err(AuthError::UserNotFound),
        }
    }

    /// Find a user by ID, whether or not the account is still active
    pub async fn get_user_by_id(&self, id: i64) -> AuthResult<User> {
        debug!("Finding user by ID: {}", id);

        match self.store.fetch_user_by_id(id).await? {
            Some(row) => User::try_from(row),
            None => Err(AuthError::UserNotFound),
        }
    }

    /// Check a username/password pair
    ///
    /// An unknown username and a wrong password fail identically, and cost
    /// the same hashing work.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> AuthResult<User> {
        let user = match self.get_user_by_username(username).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => {
                self.hasher.verify_decoy(password);
                warn!("Rejected credentials for username: {}", username);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = user.id, "Credentials verified");
            Ok(user)
        } else {
            warn!("Rejected credentials for username: {}", username);
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Soft-delete an active user
    pub async fn deactivate_user(&self, id: i64) -> AuthResult<()> {
        info!("Deactivating user: {}", id);

        match self.store.deactivate_user(id).await? {
            0 => Err(AuthError::UserNotFound),
            _ => Ok(()),
        }
    }

    /// Replace a user's metadata
    pub async fn update_metadata(&self, id: i64, metadata: &Metadata) -> AuthResult<()> {
        info!("Updating metadata for user: {}", id);

        let encoded = metadata::encode(Some(metadata))?;
        match self.store.update_user_metadata(id, &encoded).await? {
            0 => Err(AuthError::UserNotFound),
            _ => Ok(()),
        }
    }

    /// Replace a user's credential
    pub async fn change_password(&self, id: i64, new_password: &str) -> AuthResult<()> {
        info!("Changing password for user: {}", id);

        validate_password(new_password)?;
        let password_hash = self.hasher.hash(new_password)?;

        match self.store.update_user_password(id, &password_hash).await? {
            0 => Err(AuthError::UserNotFound),
            _ => Ok(()),
        }
    }
}
