// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution.
//!
//! Maps local credentials or federated provider claims onto a canonical
//! stored user, provisioning the account on first federated contact.
//!
//! ## Paths
//!
//! - **Local login**: username + password, verified against the argon2 hash
//! - **Registration**: creates a user with exactly the requested roles
//! - **Federated**: derives a username from provider claims, then
//!   insert-if-absent with `ROLE_USER`
//! - **Lookup**: read-only, used by the request gate

use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::{Map, Value};

use super::password::{hash_password, verify_password, PasswordError};
use super::roles::Role;
use crate::storage::{Store, StoreError, StoredUser, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Unknown user, wrong password, or an account without a local password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken: {0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    /// Provider returned no claim a username could be derived from.
    #[error("Identity provider returned no usable identity claims")]
    UnresolvableClaims,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => IdentityError::Conflict(what),
            other => IdentityError::Store(other),
        }
    }
}

/// Username and display name derived from federated claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub username: String,
    pub display_name: String,
}

/// Derive the canonical identity from provider claims.
///
/// Username preference: `email`, then `<login>@<provider>.local`, then
/// `<name>@<provider>.local`, then `user_<id>@oauth.local` where `id` is the
/// provider's subject claim. Blank claims count as absent.
pub fn derive_identity(
    provider: &str,
    subject_claim: &str,
    claims: &Map<String, Value>,
) -> Result<FederatedIdentity, IdentityError> {
    let provider = provider.to_lowercase();
    let name = claim_str(claims, "name");

    let username = if let Some(email) = claim_str(claims, "email") {
        email
    } else if let Some(login) = claim_str(claims, "login") {
        format!("{login}@{provider}.local")
    } else if let Some(name) = &name {
        format!("{name}@{provider}.local")
    } else if let Some(id) = claim_str(claims, subject_claim) {
        format!("user_{id}@oauth.local")
    } else {
        return Err(IdentityError::UnresolvableClaims);
    };

    let display_name = name.unwrap_or_else(|| username.clone());
    Ok(FederatedIdentity {
        username,
        display_name,
    })
}

/// String or numeric claim, trimmed. GitHub ids are numbers.
fn claim_str(claims: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match claims.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn validate_username(username: &str) -> Result<(), IdentityError> {
    if username.is_empty() {
        return Err(IdentityError::InvalidInput("Username is required".into()));
    }
    if username.chars().any(char::is_control) {
        return Err(IdentityError::InvalidInput(
            "Username must not contain control characters".into(),
        ));
    }
    Ok(())
}

/// Resolves logins and provider claims to stored users.
pub struct IdentityResolver<'a> {
    store: &'a Store,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Lookup only. Never creates.
    pub fn lookup(&self, username: &str) -> Result<Option<StoredUser>, IdentityError> {
        Ok(UserRepository::new(self.store).find(username)?)
    }

    /// Verify local credentials.
    pub fn login(&self, username: &str, password: &str) -> Result<StoredUser, IdentityError> {
        let user = self
            .lookup(username.trim())?
            .ok_or(IdentityError::InvalidCredentials)?;

        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash));
        if !verified {
            tracing::debug!(username = %user.username, "Local login rejected");
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Register a regular account with `ROLE_USER`.
    pub fn register_user(
        &self,
        username: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<StoredUser, IdentityError> {
        self.register(username, password, display_name, &[Role::User])
    }

    /// Register an elevated account with `ROLE_USER` and `ROLE_ADMIN`.
    ///
    /// Callers must restrict who can reach this path.
    pub fn register_admin(
        &self,
        username: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<StoredUser, IdentityError> {
        let user = self.register(username, password, display_name, &[Role::User, Role::Admin])?;
        tracing::info!(username = %user.username, "Admin user created");
        Ok(user)
    }

    fn register(
        &self,
        username: &str,
        password: &str,
        display_name: Option<&str>,
        roles: &[Role],
    ) -> Result<StoredUser, IdentityError> {
        let username = username.trim();
        validate_username(username)?;
        if password.is_empty() {
            return Err(IdentityError::InvalidInput("Password is required".into()));
        }

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(username);

        let user = StoredUser {
            username: username.to_string(),
            password_hash: Some(hash_password(password)?),
            display_name: display_name.to_string(),
            roles: role_names(roles),
            created_at: Utc::now(),
        };
        UserRepository::new(self.store).create(&user)?;
        tracing::info!(username = %user.username, "User registered");
        Ok(user)
    }

    /// Resolve provider claims to a user, creating it on first contact.
    ///
    /// Returns the stored user and whether this call provisioned it. Concurrent
    /// first contacts for the same identity converge on one row.
    pub fn resolve_federated(
        &self,
        provider: &str,
        subject_claim: &str,
        claims: &Map<String, Value>,
    ) -> Result<(StoredUser, bool), IdentityError> {
        let identity = derive_identity(provider, subject_claim, claims)?;
        validate_username(&identity.username)?;

        let candidate = StoredUser {
            username: identity.username,
            password_hash: None,
            display_name: identity.display_name,
            roles: role_names(&[Role::User]),
            created_at: Utc::now(),
        };
        let (user, created) = UserRepository::new(self.store).insert_if_absent(&candidate)?;
        if created {
            tracing::info!(username = %user.username, provider = %provider, "Provisioned federated user");
        }
        Ok((user, created))
    }
}

fn role_names(roles: &[Role]) -> BTreeSet<String> {
    roles.iter().map(|role| role.as_str().to_string()).collect()
}
