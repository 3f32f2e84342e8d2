// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gate.
//!
//! Runs once per request, before routing to handlers. A valid bearer token
//! whose subject still exists attaches an [`AuthenticatedUser`] to the request
//! extensions. Anything else leaves the request anonymous; the gate never
//! rejects. Routes that need a principal ask for one with the extractors in
//! `extractor.rs`.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), authenticate))
//!     .with_state(state);
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::claims::AuthenticatedUser;
use super::identity::IdentityResolver;
use crate::state::AppState;

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the request principal, if any.
pub fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let token = bearer_token(headers)?;

    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected");
            return None;
        }
    };

    match IdentityResolver::new(&state.store).lookup(&claims.sub) {
        Ok(Some(user)) => Some(AuthenticatedUser::from_stored(&user)),
        Ok(None) => {
            tracing::warn!(username = %claims.sub, "Valid token for unknown user");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Principal lookup failed");
            None
        }
    }
}

/// Middleware attaching the principal to the request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Never trust a principal that arrived with the request.
    request.extensions_mut().remove::<AuthenticatedUser>();

    if let Some(user) = resolve_principal(&state, request.headers()) {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}
