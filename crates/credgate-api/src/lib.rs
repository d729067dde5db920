use std::fmt;

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type Email = String;

/// Email/password pair presented at login. Lives only for the duration of the call.
#[derive(Clone, Deserialize)]
pub struct Credential {
    pub email: Email,
    pub password: String,
}

impl Credential {
    pub fn new(email: impl Into<Email>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity fields carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: Email,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub user_id: UserId,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Unauthorized,
    Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The lookup expected exactly one row.
    #[error("expected exactly one match, found {found}")]
    Cardinality { found: usize },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("token does not match a known identity")]
    IdentityMismatch,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("password hashing error: {0}")]
    Hashing(String),
    #[error("token signing error: {0}")]
    Token(String),
}

impl AuthError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::InvalidCredentials
            | AuthError::IdentityMismatch
            | AuthError::InvalidToken(_) => ErrorClass::Unauthorized,
            AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::Token(_) => {
                ErrorClass::Infrastructure
            }
        }
    }

    pub fn http_status(&self) -> u16 {
        match self.class() {
            ErrorClass::Unauthorized => 401,
            ErrorClass::Infrastructure => 500,
        }
    }
}

/// Keyed lookup over persisted users.
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Cardinality`] unless exactly one user has this email.
    fn user_id_by_email(&self, email: &str) -> Result<UserId, StoreError>;
    fn password_hash_by_user_id(&self, user_id: UserId) -> Result<String, StoreError>;
}

/// One-way password hashing with constant-time verification.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;
    /// `Ok(false)` on mismatch. `Err` only when the hash itself is unusable.
    fn matches(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

pub trait TokenCodec: Send + Sync {
    fn issue(&self, claims: &IdentityClaims) -> Result<String, AuthError>;
    fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError>;
}

pub trait SecretStore: Send + Sync {
    fn get(&self, secret_ref: &str) -> Result<String, StoreError>;
}

pub trait AuthEngine: Send + Sync {
    fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError>;
    fn resolve_user_id(&self, email: &str) -> Result<UserId, AuthError>;
    fn authenticate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
