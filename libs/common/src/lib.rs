//! Common library for the authkit workspace
//!
//! This crate resolves store configuration into a connection pool for one of
//! the supported relational backends, and defines the store-level error type.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;

pub use database::{BackendKind, DatabaseConfig, StorePool, TlsMode, health_check, init_pool};
pub use error::{DatabaseError, DatabaseResult};
