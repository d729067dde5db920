//! Error types.

use credgate_api::AuthError;
use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// JWT is malformed or missing required fields.
    #[error("invalid JWT: {0}")]
    InvalidJwt(String),

    /// HMAC secret is too short to sign with.
    #[error("signing secret must be at least {min} bytes, got {len}")]
    WeakSecret {
        /// Length of the rejected secret.
        len: usize,
        /// Required minimum.
        min: usize,
    },

    /// Token claims failed validation.
    #[error("token validation failed: {0}")]
    Validation(String),

    /// Argon2 parameters, hashing, or PHC parsing failed.
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// jsonwebtoken error.
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    /// Classify a failure raised while checking an incoming token.
    pub(crate) fn into_token_rejection(self) -> AuthError {
        AuthError::InvalidToken(self.to_string())
    }

    /// Classify a failure raised while signing an outgoing token.
    pub(crate) fn into_signing_failure(self) -> AuthError {
        AuthError::Token(self.to_string())
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(e: argon2::password_hash::Error) -> Self {
        Error::PasswordHash(e.to_string())
    }
}

impl From<argon2::Error> for Error {
    fn from(e: argon2::Error) -> Self {
        Error::PasswordHash(e.to_string())
    }
}
