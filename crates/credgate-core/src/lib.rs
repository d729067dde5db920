use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use credgate_api::UserId;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "auth.toml";
pub const USERS_FILE: &str = "users.toml";

/// Longest session token lifetime accepted in `[token]` (one year).
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 3600;
/// Largest clock leeway accepted in `[token]`.
pub const MAX_LEEWAY_SECONDS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPolicy {
    pub issuer: String,
    pub secret_ref: String,
    pub ttl_seconds: u64,
    pub leeway_seconds: u64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            issuer: "credgate".to_string(),
            secret_ref: "CREDGATE_JWT_SECRET".to_string(),
            ttl_seconds: 3600,
            leeway_seconds: 30,
        }
    }
}

/// How emails are compared when resolving an identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailPolicy {
    /// Byte-for-byte comparison.
    #[default]
    Exact,
    /// Surrounding whitespace trimmed, then lowercased.
    Normalized,
}

impl EmailPolicy {
    pub fn apply<'a>(&self, email: &'a str) -> Cow<'a, str> {
        match self {
            EmailPolicy::Exact => Cow::Borrowed(email),
            EmailPolicy::Normalized => Cow::Owned(email.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPolicy {
    pub email_policy: EmailPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: TokenPolicy,
    pub identity: IdentityPolicy,
    pub password: PasswordPolicy,
}

pub fn validate_config(cfg: &AuthConfig) -> Result<(), ConfigError> {
    if cfg.token.issuer.trim().is_empty() {
        return Err(ConfigError::Validation("token.issuer is empty".to_string()));
    }
    if cfg.token.secret_ref.trim().is_empty() {
        return Err(ConfigError::Validation(
            "token.secret_ref is empty".to_string(),
        ));
    }
    if cfg.token.ttl_seconds == 0 || cfg.token.ttl_seconds > MAX_TTL_SECONDS {
        return Err(ConfigError::Validation(format!(
            "token.ttl_seconds must be between 1 and {MAX_TTL_SECONDS}"
        )));
    }
    if cfg.token.leeway_seconds > MAX_LEEWAY_SECONDS {
        return Err(ConfigError::Validation(format!(
            "token.leeway_seconds must be at most {MAX_LEEWAY_SECONDS}"
        )));
    }
    let p = &cfg.password;
    if p.iterations == 0 || p.parallelism == 0 {
        return Err(ConfigError::Validation(
            "password.iterations and password.parallelism must be positive".to_string(),
        ));
    }
    let min_memory = p.parallelism.checked_mul(8).ok_or_else(|| {
        ConfigError::Validation(format!(
            "password.parallelism {} is out of range",
            p.parallelism
        ))
    })?;
    if p.memory_kib < min_memory {
        return Err(ConfigError::Validation(format!(
            "password.memory_kib must be at least {min_memory} for parallelism {}",
            p.parallelism
        )));
    }
    Ok(())
}

/// A stored user as read from the directory file.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    pub users: Vec<UserRecord>,
}

/// Rejects duplicate ids and blank fields. Duplicate emails are allowed here; they
/// surface as an identity mismatch when resolved.
pub fn validate_users(dir: &UserDirectory) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for user in &dir.users {
        if !seen.insert(user.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate user id {}",
                user.id
            )));
        }
        if user.email.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "user {} has an empty email",
                user.id
            )));
        }
        if user.password_hash.is_empty() {
            return Err(ConfigError::Validation(format!(
                "user {} has an empty password_hash",
                user.id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawUsers {
    #[serde(default)]
    users: Vec<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: UserId,
    email: String,
    password_hash: String,
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("credgate")
    } else {
        PathBuf::from(".credgate")
    }
}

pub fn load_config_from_dir(dir: &Path) -> Result<AuthConfig, ConfigError> {
    load_config_from_file(&dir.join(CONFIG_FILE))
}

/// Load `auth.toml` from `dir`, using defaults only when the file does not exist.
/// A file that exists but fails to read, parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<AuthConfig, ConfigError> {
    match load_config_from_dir(dir) {
        Err(ConfigError::NotFound(reason)) => {
            tracing::debug!(%reason, "no auth config, using defaults");
            Ok(AuthConfig::default())
        }
        other => other,
    }
}

pub fn load_config_from_file(path: &Path) -> Result<AuthConfig, ConfigError> {
    let content = read(path)?;
    let cfg: AuthConfig = toml::from_str(&content).map_err(|e| {
        ConfigError::Validation(format!("invalid TOML in {}: {e}", path.display()))
    })?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn load_users_from_dir(dir: &Path, policy: EmailPolicy) -> Result<UserDirectory, ConfigError> {
    load_users_from_file(&dir.join(USERS_FILE), policy)
}

/// Load the user directory, normalizing stored emails when `policy` asks for it.
pub fn load_users_from_file(
    path: &Path,
    policy: EmailPolicy,
) -> Result<UserDirectory, ConfigError> {
    let content = read(path)?;
    let raw: RawUsers = toml::from_str(&content).map_err(|e| {
        ConfigError::Validation(format!("invalid TOML in {}: {e}", path.display()))
    })?;

    let users = raw
        .users
        .into_iter()
        .map(|u| UserRecord {
            id: u.id,
            email: u.email,
            password_hash: u.password_hash,
        })
        .collect();

    prepare_users(UserDirectory { users }, policy)
}

/// Apply `policy` to every stored email, then validate. Idempotent, so a directory
/// that already went through a loader can be prepared again.
pub fn prepare_users(
    mut dir: UserDirectory,
    policy: EmailPolicy,
) -> Result<UserDirectory, ConfigError> {
    for user in &mut dir.users {
        let email = policy.apply(&user.email).into_owned();
        user.email = email;
    }
    validate_users(&dir)?;
    Ok(dir)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| {
        let msg = format!("failed to read {}: {e}", path.display());
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(msg)
        } else {
            ConfigError::Io(msg)
        }
    })
}

pub fn write_default_config_files(dir: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(dir)
        .map_err(|e| ConfigError::Io(format!("failed to create {}: {e}", dir.display())))?;

    let files: [(&str, &str); 2] = [
        (
            CONFIG_FILE,
            include_str!("../../../docs/credgate/examples/auth.toml.example"),
        ),
        (
            USERS_FILE,
            include_str!("../../../docs/credgate/examples/users.toml.example"),
        ),
    ];

    for (name, body) in files {
        let path = dir.join(name);
        if !path.exists() {
            fs::write(&path, body).map_err(|e| {
                ConfigError::Io(format!("failed to write {}: {e}", path.display()))
            })?;
        }
    }

    Ok(())
}
