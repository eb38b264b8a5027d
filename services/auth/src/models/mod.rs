//! Identity models

pub mod session;
pub mod user;

// Re-export for convenience
pub use session::{NewSession, Session};
pub use user::{NewUser, User, UserRow};
