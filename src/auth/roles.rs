// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles known to the storefront.
///
/// Stored on users by their wire name (`ROLE_USER`, `ROLE_ADMIN`). Unknown
/// names found on a stored user are ignored by authorization checks.
///
/// ## Role Hierarchy
///
/// - `Admin` - Catalogue management, all orders, status updates, admin registration
/// - `User` - Browse, place orders, read own orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }

    /// Parse a stored role name. Exact match.
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "ROLE_USER" => Some(Role::User),
            "ROLE_ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role for newly provisioned accounts.
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::User));
    }

    #[test]
    fn user_lacks_admin_privilege() {
        assert!(Role::User.has_privilege(Role::User));
        assert!(!Role::User.has_privilege(Role::Admin));
    }

    #[test]
    fn names_round_trip() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::from_name(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_name("role_admin"), None);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""ROLE_ADMIN""#);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
