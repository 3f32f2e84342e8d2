// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated principal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// The principal attached to an authenticated request.
///
/// Built from the stored user on every request; nothing about it is cached
/// between requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub username: String,
    pub display_name: String,
    pub roles: BTreeSet<Role>,
}

impl AuthenticatedUser {
    /// Project a stored user. Role names this service does not know are dropped.
    pub fn from_stored(user: &StoredUser) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            roles: user
                .roles
                .iter()
                .filter_map(|name| Role::from_name(name))
                .collect(),
        }
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.roles.iter().any(|role| role.has_privilege(required))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
