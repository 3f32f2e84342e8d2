// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Stateless bearer-token authentication for the storefront API.
//!
//! ## Auth Flow
//!
//! 1. The client logs in locally (`POST /api/auth/login`) or through an
//!    OAuth2 provider (`/oauth2/authorization/{provider}`)
//! 2. The server issues an HS256 token whose subject is the username
//! 3. The client sends `Authorization: Bearer <token>`
//! 4. The gate (`middleware::authenticate`) verifies signature and expiry,
//!    looks the user up (never creating it) and attaches the principal
//! 5. Handlers enforce access with [`Auth`] or [`AdminOnly`]
//!
//! ## Security
//!
//! - Tokens are signed with a key of at least 256 bits
//! - Malformed, badly signed and expired tokens are indistinguishable
//! - No sessions, no refresh tokens, no revocation
//! - Passwords are hashed with argon2id

pub mod claims;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod roles;
pub mod token;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, OptionalAuth};
pub use identity::{derive_identity, FederatedIdentity, IdentityError, IdentityResolver};
pub use middleware::{authenticate, bearer_token};
pub use oauth::{OAuthClients, OAuthError, ProviderRegistration};
pub use password::{hash_password, verify_password, PasswordError};
pub use roles::Role;
pub use token::{TokenError, TokenService};
