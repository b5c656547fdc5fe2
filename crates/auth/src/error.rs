use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username and password are required.")]
    EmptyCredentials,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Too many failed attempts. Try again in {} minutes.", remaining.as_secs().div_ceil(60))]
    Locked { remaining: Duration },

    #[error("E-mail domain '{0}' is not authorized.")]
    UnauthorizedDomain(String),

    #[error("Microsoft sign-in is not enabled.")]
    EntraDisabled,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}
