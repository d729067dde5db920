use std::collections::BTreeMap;

use credgate_api::{SecretStore, StoreError, UserId, UserStore};
use credgate_core::{UserDirectory, UserRecord};
use tracing::debug;

pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, StoreError> {
        std::env::var(secret_ref)
            .map_err(|_| StoreError::NotFound(format!("missing secret env var {secret_ref}")))
    }
}

/// Read-only user store over a loaded [`UserDirectory`].
///
/// Emails are compared exactly; callers apply any normalization before lookup.
/// Duplicate emails are kept so lookups can report them as a cardinality error.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Vec<UserRecord>,
    by_id: BTreeMap<UserId, usize>,
}

impl InMemoryUserStore {
    pub fn new(users: Vec<UserRecord>) -> Self {
        let by_id = users
            .iter()
            .enumerate()
            .map(|(idx, u)| (u.id, idx))
            .collect();
        Self { users, by_id }
    }

    pub fn from_directory(dir: UserDirectory) -> Self {
        Self::new(dir.users)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserStore for InMemoryUserStore {
    fn user_id_by_email(&self, email: &str) -> Result<UserId, StoreError> {
        let mut matches = self.users.iter().filter(|u| u.email == email);
        match (matches.next(), matches.next()) {
            (Some(user), None) => Ok(user.id),
            (None, _) => Err(StoreError::Cardinality { found: 0 }),
            (Some(_), Some(_)) => {
                let found = 2 + matches.count();
                debug!(found, "email matches more than one user");
                Err(StoreError::Cardinality { found })
            }
        }
    }

    fn password_hash_by_user_id(&self, user_id: UserId) -> Result<String, StoreError> {
        self.by_id
            .get(&user_id)
            .and_then(|idx| self.users.get(*idx))
            .map(|u| u.password_hash.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, email: &str) -> UserRecord {
        UserRecord {
            id,
            email: email.to_string(),
            password_hash: format!("hash-{id}"),
        }
    }

    #[test]
    fn lookup_by_email_and_id() {
        let store = InMemoryUserStore::new(vec![user(1, "a@x.com"), user(2, "b@x.com")]);
        assert_eq!(store.user_id_by_email("b@x.com"), Ok(2));
        assert_eq!(store.password_hash_by_user_id(1).as_deref(), Ok("hash-1"));
    }

    #[test]
    fn cardinality_errors() {
        let store = InMemoryUserStore::new(vec![
            user(1, "a@x.com"),
            user(2, "dup@x.com"),
            user(3, "dup@x.com"),
            user(4, "dup@x.com"),
        ]);
        assert_eq!(
            store.user_id_by_email("nobody@x.com"),
            Err(StoreError::Cardinality { found: 0 })
        );
        assert_eq!(
            store.user_id_by_email("dup@x.com"),
            Err(StoreError::Cardinality { found: 3 })
        );
    }

    #[test]
    fn comparison_is_exact() {
        let store = InMemoryUserStore::new(vec![user(1, "a@x.com")]);
        assert!(store.user_id_by_email("A@x.com").is_err());
        assert!(store.user_id_by_email(" a@x.com").is_err());
    }

    #[test]
    fn missing_id_is_not_found() {
        let store = InMemoryUserStore::default();
        assert!(store.is_empty());
        assert!(matches!(
            store.password_hash_by_user_id(9),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn env_secret_missing() {
        let err = EnvSecretStore
            .get("CREDGATE_TEST_SECRET_THAT_IS_NEVER_SET")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
