//! Repositories over the record store

pub mod user;

pub use user::UserRepository;
