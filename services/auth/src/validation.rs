//! Input validation for account creation

use crate::error::{AuthError, AuthResult};

fn invalid(message: &str) -> AuthError {
    AuthError::InvalidInput(message.to_string())
}

/// Validate username
///
/// Any characters are accepted. Usernames are compared case-sensitively
/// everywhere, so no normalisation happens here.
pub fn validate_username(username: &str) -> AuthResult<()> {
    if username.is_empty() {
        return Err(invalid("Username is required"));
    }

    if username.chars().count() < 3 {
        return Err(invalid("Username must be at least 3 characters long"));
    }

    if username.chars().count() > 64 {
        return Err(invalid("Username must be at most 64 characters long"));
    }

    Ok(())
}

/// Validate email
///
/// The address is stored as given; deliverability is the host's concern.
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() {
        return Err(invalid("Email is required"));
    }

    if email.len() > 254 {
        return Err(invalid("Email must be at most 254 characters long"));
    }

    Ok(())
}

/// Validate password
///
/// Only length is enforced; composition rules belong to the host.
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.is_empty() {
        return Err(invalid("Password is required"));
    }

    if password.chars().count() < 8 {
        return Err(invalid("Password must be at least 8 characters long"));
    }

    if password.len() > 128 {
        return Err(invalid("Password must be at most 128 bytes long"));
    }

    Ok(())
}
