//! Session token signing and verification (HS256).

use crate::{Error, Result};

use credgate_api::{AuthError, IdentityClaims, TokenCodec, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Shortest HMAC secret accepted by [`JwtCodec::new`].
pub const MIN_SECRET_LEN: usize = 32;

/// Largest clock leeway accepted by [`JwtCodec::new`].
pub const MAX_LEEWAY_SECONDS: u64 = 3600;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Options for token issuance and verification.
#[derive(Debug, Clone)]
pub struct JwtOptions {
    /// Value written to and required in `iss`.
    pub issuer: String,

    /// Lifetime of issued tokens.
    pub ttl_seconds: u64,

    /// Clock skew/leeway in seconds.
    pub leeway_seconds: u64,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            issuer: "credgate".to_string(),
            ttl_seconds: 3600,
            leeway_seconds: 30,
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Email of the authenticated user.
    pub sub: String,
    /// User id.
    pub uid: UserId,
    /// Issuer.
    pub iss: String,
    /// Issued at (unix seconds).
    pub iat: u64,
    /// Expiry (unix seconds).
    pub exp: u64,
    /// Unique token id; two logins never yield the same token.
    pub jti: String,
}

impl SessionClaims {
    /// Identity part of the claims.
    pub fn identity(&self) -> IdentityClaims {
        IdentityClaims {
            email: self.sub.clone(),
            user_id: self.uid,
        }
    }
}

/// Signs and verifies session tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    opts: JwtOptions,
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Build a codec. Rejects secrets shorter than [`MIN_SECRET_LEN`], a zero TTL and
    /// leeway above [`MAX_LEEWAY_SECONDS`].
    pub fn new(secret: &[u8], opts: JwtOptions) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::WeakSecret {
                len: secret.len(),
                min: MIN_SECRET_LEN,
            });
        }
        if opts.ttl_seconds == 0 {
            return Err(Error::Validation("ttl_seconds must be positive".to_string()));
        }
        if opts.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(Error::Validation(format!(
                "leeway_seconds must be at most {MAX_LEEWAY_SECONDS}"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            opts,
        })
    }

    /// Sign a fresh token for `claims`.
    pub fn encode(&self, claims: &IdentityClaims) -> Result<String> {
        let iat = now_epoch_secs();
        let exp = iat.checked_add(self.opts.ttl_seconds).ok_or_else(|| {
            Error::Validation(format!(
                "ttl_seconds {} overflows the expiry timestamp",
                self.opts.ttl_seconds
            ))
        })?;
        let session = SessionClaims {
            sub: claims.email.clone(),
            uid: claims.user_id,
            iss: self.opts.issuer.clone(),
            iat,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.sign(&session)
    }

    fn sign(&self, session: &SessionClaims) -> Result<String> {
        Ok(jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            session,
            &self.encoding,
        )?)
    }

    /// Verify signature, expiry and issuer, returning the full claim set.
    pub fn decode(&self, token: &str) -> Result<SessionClaims> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| Error::InvalidJwt(format!("failed to decode header: {e}")))?;

        if header.alg != ALGORITHM {
            return Err(Error::InvalidJwt(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = self.opts.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[self.opts.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)?;

        if data.claims.sub.is_empty() {
            return Err(Error::Validation("empty sub".to_string()));
        }

        Ok(data.claims)
    }
}

impl TokenCodec for JwtCodec {
    fn issue(&self, claims: &IdentityClaims) -> std::result::Result<String, AuthError> {
        self.encode(claims).map_err(Error::into_signing_failure)
    }

    fn verify(&self, token: &str) -> std::result::Result<IdentityClaims, AuthError> {
        self.decode(token)
            .map(|session| session.identity())
            .map_err(Error::into_token_rejection)
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> JwtCodec {
        JwtCodec::new(SECRET, JwtOptions::default()).unwrap()
    }

    fn alice() -> IdentityClaims {
        IdentityClaims {
            email: "a@x.com".to_string(),
            user_id: 1,
        }
    }

    #[test]
    fn issued_token_carries_identity() {
        let codec = codec();
        let token = codec.issue(&alice()).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), alice());

        let full = codec.decode(&token).unwrap();
        assert_eq!(full.iss, "credgate");
        assert_eq!(full.exp, full.iat + 3600);
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let codec = codec();
        let a = codec.issue(&alice()).unwrap();
        let b = codec.issue(&alice()).unwrap();
        assert_ne!(a, b);
        assert!(codec.verify(&a).is_ok());
        assert!(codec.verify(&b).is_ok());
    }

    #[test]
    fn short_secret_rejected() {
        let err = JwtCodec::new(b"short", JwtOptions::default()).unwrap_err();
        assert!(matches!(err, Error::WeakSecret { len: 5, .. }));
    }

    #[test]
    fn foreign_secret_rejected() {
        let token = codec().issue(&alice()).unwrap();
        let other = JwtCodec::new(b"ffffffffffffffffffffffffffffffff", JwtOptions::default())
            .unwrap();
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn wrong_issuer_rejected() {
        let token = codec().issue(&alice()).unwrap();
        let other = JwtCodec::new(
            SECRET,
            JwtOptions {
                issuer: "someone-else".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn unbounded_ttl_fails_to_sign_instead_of_wrapping() {
        let codec = JwtCodec::new(
            SECRET,
            JwtOptions {
                ttl_seconds: u64::MAX,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            codec.encode(&alice()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(codec.issue(&alice()), Err(AuthError::Token(_))));
    }

    #[test]
    fn ttl_and_leeway_bounds_checked_at_construction() {
        let zero_ttl = JwtCodec::new(
            SECRET,
            JwtOptions {
                ttl_seconds: 0,
                ..Default::default()
            },
        );
        assert!(matches!(zero_ttl, Err(Error::Validation(_))));

        let huge_leeway = JwtCodec::new(
            SECRET,
            JwtOptions {
                leeway_seconds: u64::MAX,
                ..Default::default()
            },
        );
        assert!(matches!(huge_leeway, Err(Error::Validation(_))));

        let at_limit = JwtCodec::new(
            SECRET,
            JwtOptions {
                leeway_seconds: MAX_LEEWAY_SECONDS,
                ..Default::default()
            },
        );
        assert!(at_limit.is_ok());
    }

    #[test]
    fn expired_token_rejected() {
        let codec = JwtCodec::new(
            SECRET,
            JwtOptions {
                leeway_seconds: 0,
                ..Default::default()
            },
        )
        .unwrap();
        let now = now_epoch_secs();
        let stale = SessionClaims {
            sub: "a@x.com".to_string(),
            uid: 1,
            iss: "credgate".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            jti: "stale".to_string(),
        };
        let token = codec.sign(&stale).unwrap();
        assert!(matches!(
            codec.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            codec().verify("not-a-jwt"),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
