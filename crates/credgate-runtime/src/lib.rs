use credgate_api::{
    AuthEngine, AuthError, AuthenticatedUser, IdentityClaims, LoginResult, PasswordHasher,
    SecretStore, StoreError, TokenCodec, UserId, UserStore,
};
use credgate_auth::{Argon2Hasher, JwtCodec, JwtOptions};
use credgate_connectors::InMemoryUserStore;
use credgate_core::{
    AuthConfig, ConfigError, EmailPolicy, UserDirectory, prepare_users, validate_config,
};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("signing secret unavailable: {0}")]
    Secret(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] credgate_auth::Error),
}

/// Login orchestration over a user store, a password hasher and a token codec.
///
/// Holds no mutable state; one instance can serve any number of concurrent calls.
pub struct AuthService {
    store: Box<dyn UserStore>,
    hasher: Box<dyn PasswordHasher>,
    codec: Box<dyn TokenCodec>,
    email_policy: EmailPolicy,
}

impl AuthService {
    pub fn new(
        store: Box<dyn UserStore>,
        hasher: Box<dyn PasswordHasher>,
        codec: Box<dyn TokenCodec>,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            email_policy: EmailPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_email_policy(mut self, policy: EmailPolicy) -> Self {
        self.email_policy = policy;
        self
    }

    /// Wire the bundled Argon2id hasher, HS256 codec and in-memory store from config.
    ///
    /// `users` is normalized under the configured email policy and validated before it
    /// reaches the store.
    pub fn from_config(
        cfg: &AuthConfig,
        users: UserDirectory,
        secrets: &dyn SecretStore,
    ) -> Result<Self, SetupError> {
        validate_config(cfg)?;

        let secret = secrets.get(&cfg.token.secret_ref)?;
        let codec = JwtCodec::new(
            secret.as_bytes(),
            JwtOptions {
                issuer: cfg.token.issuer.clone(),
                ttl_seconds: cfg.token.ttl_seconds,
                leeway_seconds: cfg.token.leeway_seconds,
            },
        )?;
        let hasher = Argon2Hasher::new(
            cfg.password.memory_kib,
            cfg.password.iterations,
            cfg.password.parallelism,
        )?;
        let users = prepare_users(users, cfg.identity.email_policy)?;
        let store = InMemoryUserStore::from_directory(users);
        debug!(users = store.len(), "auth service configured");

        Ok(
            Self::new(Box::new(store), Box::new(hasher), Box::new(codec))
                .with_email_policy(cfg.identity.email_policy),
        )
    }

    fn verify_credentials(&self, password: &str, user_id: UserId) -> Result<(), AuthError> {
        let hash = self
            .store
            .password_hash_by_user_id(user_id)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        if self.hasher.matches(password, &hash)? {
            Ok(())
        } else {
            warn!(user_id, "password mismatch");
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl AuthEngine for AuthService {
    fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        debug!("login attempt");

        // Unknown and ambiguous emails look like a bad password to the caller.
        let user_id = match self.resolve_user_id(email) {
            Err(AuthError::IdentityMismatch) => return Err(AuthError::InvalidCredentials),
            other => other?,
        };

        self.verify_credentials(password, user_id)?;

        let claims = IdentityClaims {
            email: self.email_policy.apply(email).into_owned(),
            user_id,
        };
        let token = self.codec.issue(&claims)?;

        info!(user_id, "login succeeded");
        Ok(LoginResult { user_id, token })
    }

    fn resolve_user_id(&self, email: &str) -> Result<UserId, AuthError> {
        let email = self.email_policy.apply(email);
        self.store.user_id_by_email(&email).map_err(|e| match e {
            StoreError::Cardinality { found } => {
                warn!(found, "email did not resolve to exactly one user");
                AuthError::IdentityMismatch
            }
            other => AuthError::Storage(other.to_string()),
        })
    }

    fn authenticate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.codec.verify(token)?;
        let user_id = self.resolve_user_id(&claims.email)?;

        if user_id != claims.user_id {
            warn!(
                token_user_id = claims.user_id,
                user_id, "token user id no longer matches its email"
            );
            return Err(AuthError::IdentityMismatch);
        }

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
        })
    }
}
