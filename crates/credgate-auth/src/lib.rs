//! credgate-auth
//!
//! Concrete credential primitives for the credgate service:
//!
//! - **`JwtCodec`** signs and verifies HS256 session tokens carrying the user's email and id
//! - **`Argon2Hasher`** hashes passwords with Argon2id and verifies them in constant time
//!
//! Both implement the collaborator traits from `credgate-api`, so the login flow never
//! depends on them directly.
//!
//! ## Quick start
//! ```no_run
//! use credgate_api::{IdentityClaims, TokenCodec};
//! use credgate_auth::{JwtCodec, JwtOptions};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = JwtCodec::new(b"an-hmac-secret-of-at-least-32-bytes!", JwtOptions::default())?;
//! let token = codec.issue(&IdentityClaims { email: "a@x.com".to_string(), user_id: 1 })?;
//! let claims = codec.verify(&token)?;
//! assert_eq!(claims.user_id, 1);
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod error;
mod jwt;
mod password;

pub use error::{Error, Result};
pub use jwt::{JwtCodec, JwtOptions, MAX_LEEWAY_SECONDS, MIN_SECRET_LEN, SessionClaims};
pub use password::Argon2Hasher;
