// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User and role repository.
//!
//! Users are keyed by username (which doubles as the login / email). Role rows
//! are created lazily the first time a user needs them; both the role and the
//! user are written in the same transaction so first-creation races converge
//! on a single row.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::database::{Ledger, Store, StoreError, StoreResult, ROLES, USERS};

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Unique login name (email for federated accounts)
    pub username: String,
    /// Argon2 PHC string; `None` for OAuth-only accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Human-readable name
    pub display_name: String,
    /// Role names, e.g. `ROLE_USER`
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }
}

/// Role row. Effectively immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRole {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for user and role operations.
pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Lookup only; never creates.
    pub fn find(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        self.store.read_json(USERS, username)
    }

    /// Insert a new user, failing with `Conflict` if the username is taken.
    ///
    /// Missing role rows are created in the same transaction.
    pub fn create(&self, user: &StoredUser) -> StoreResult<()> {
        self.store.write(|ledger| {
            if ledger.get_json::<StoredUser>(USERS, &user.username)?.is_some() {
                return Err(StoreError::Conflict(format!("User {}", user.username)));
            }
            for role in &user.roles {
                ensure_role(ledger, role)?;
            }
            ledger.put_json(USERS, &user.username, user)
        })
    }

    /// Atomic "insert if absent, else return existing".
    ///
    /// Returns the persisted row and whether this call created it.
    pub fn insert_if_absent(&self, user: &StoredUser) -> StoreResult<(StoredUser, bool)> {
        self.store.write(|ledger| {
            if let Some(existing) = ledger.get_json::<StoredUser>(USERS, &user.username)? {
                return Ok((existing, false));
            }
            for role in &user.roles {
                ensure_role(ledger, role)?;
            }
            ledger.put_json(USERS, &user.username, user)?;
            Ok((user.clone(), true))
        })
    }

    pub fn list(&self) -> StoreResult<Vec<StoredUser>> {
        self.store.scan_json(USERS)
    }
}

/// Role find-or-create inside an already open write transaction.
pub(crate) fn ensure_role(ledger: &mut Ledger<'_>, name: &str) -> StoreResult<StoredRole> {
    if let Some(role) = ledger.get_json::<StoredRole>(ROLES, name)? {
        return Ok(role);
    }
    let role = StoredRole {
        name: name.to_string(),
        created_at: Utc::now(),
    };
    ledger.put_json(ROLES, name, &role)?;
    tracing::info!(role = %name, "Created role");
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn role(store: &Store, name: &str) -> Option<StoredRole> {
        store.read_json(ROLES, name).unwrap()
    }

    fn role_count(store: &Store) -> usize {
        store.scan_json::<StoredRole>(ROLES).unwrap().len()
    }

    fn user(username: &str, roles: &[&str]) -> StoredUser {
        StoredUser {
            username: username.to_string(),
            password_hash: None,
            display_name: username.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_find_user() {
        let store = Store::in_memory().unwrap();
        let repo = UserRepository::new(&store);

        repo.create(&user("alice@example.com", &["ROLE_USER"])).unwrap();

        let loaded = repo.find("alice@example.com").unwrap().unwrap();
        assert_eq!(loaded.username, "alice@example.com");
        assert!(loaded.has_role("ROLE_USER"));
        assert!(role(&store, "ROLE_USER").is_some());
    }

    #[test]
    fn duplicate_username_rejected() {
        let store = Store::in_memory().unwrap();
        let repo = UserRepository::new(&store);

        repo.create(&user("bob", &["ROLE_USER"])).unwrap();
        let result = repo.create(&user("bob", &["ROLE_USER", "ROLE_ADMIN"]));
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // First row untouched, and the rejected admin role was never created
        assert!(!repo.find("bob").unwrap().unwrap().has_role("ROLE_ADMIN"));
        assert!(role(&store, "ROLE_ADMIN").is_none());
    }

    #[test]
    fn insert_if_absent_returns_existing() {
        let store = Store::in_memory().unwrap();
        let repo = UserRepository::new(&store);

        let (first, created) = repo.insert_if_absent(&user("carol", &["ROLE_USER"])).unwrap();
        assert!(created);

        let mut second = user("carol", &["ROLE_USER"]);
        second.display_name = "Someone Else".to_string();
        let (existing, created) = repo.insert_if_absent(&second).unwrap();
        assert!(!created);
        assert_eq!(existing, first);
    }

    #[test]
    fn ensure_role_is_idempotent() {
        let store = Store::in_memory().unwrap();

        let a = store.write(|ledger| ensure_role(ledger, "ROLE_USER")).unwrap();
        let b = store.write(|ledger| ensure_role(ledger, "ROLE_USER")).unwrap();
        assert_eq!(a, b);
        assert_eq!(role_count(&store), 1);
    }

    #[test]
    fn concurrent_role_creation_converges() {
        let store = Arc::new(Store::in_memory().unwrap());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    store
                        .write(|ledger| ensure_role(ledger, "ROLE_USER"))
                        .unwrap();
                });
            }
        });

        assert_eq!(role_count(&store), 1);
    }
}
