//! Minimal user-identity toolkit
//!
//! Stores users with argon2-hashed credentials, issues and validates
//! server-side sessions, and carries caller-owned metadata on each user
//! without schema changes. The relational schema is bootstrapped externally
//! from the files under `schema/`.
//!
//! ```rust,no_run
//! use authkit::{AuthManager, AuthSettings};
//! use common::DatabaseConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = DatabaseConfig::from_env()?;
//!     let auth = AuthManager::connect(&database, &AuthSettings::from_env()?).await?;
//!
//!     auth.users()
//!         .create_user("amina", "amina@example.com", "correct horse battery")
//!         .await?;
//!     let (_user, session) = auth
//!         .login("amina", "correct horse battery", "127.0.0.1", "curl/8")
//!         .await?;
//!     let (_session, user) = auth.current_user(&session.token).await?;
//!     println!("signed in as {}", user.username);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod manager;
pub mod metadata;
pub mod models;
pub mod password;
pub mod repositories;
pub mod session;
pub mod settings;
pub mod store;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use metadata::Metadata;
pub use models::{Session, User};
pub use password::{CredentialHasher, HasherConfig};
pub use repositories::UserRepository;
pub use session::{Clock, SessionManager};
pub use settings::AuthSettings;
pub use store::RecordStore;
