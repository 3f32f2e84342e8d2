// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 login endpoints.
//!
//! Both endpoints answer with redirects. The callback always lands on the
//! configured front-end page: with `token`, `username` and `isAdmin` on
//! success, or with `error` on any failure.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use url::Url;
use utoipa::IntoParams;

use crate::{
    auth::{AuthenticatedUser, IdentityResolver, OAuthError},
    error::ApiError,
    models::AuthResponse,
    state::AppState,
};

/// Query parameters sent back by the provider.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denied access
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Start a federated login.
#[utoipa::path(
    get,
    path = "/oauth2/authorization/{provider}",
    tag = "OAuth2",
    params(("provider" = String, Path, description = "Provider name, e.g. google")),
    responses(
        (status = 303, description = "Redirect to the provider's authorization endpoint"),
        (status = 404, description = "Unknown provider")
    )
)]
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Redirect, ApiError> {
    let url = state.oauth.authorization_url(&provider)?;
    tracing::debug!(provider = %provider, "Redirecting to OAuth2 provider");
    Ok(Redirect::to(url.as_str()))
}

/// Provider callback: exchange the code, provision the user, hand a token to the front end.
#[utoipa::path(
    get,
    path = "/login/oauth2/code/{provider}",
    tag = "OAuth2",
    params(
        ("provider" = String, Path, description = "Provider name"),
        CallbackParams
    ),
    responses(
        (status = 303, description = "Redirect to the front end with a token or an error")
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let mut target = Url::parse(&state.oauth_redirect_uri).map_err(ApiError::internal)?;

    match complete_login(&state, &provider, params).await {
        Ok(auth) => {
            target
                .query_pairs_mut()
                .append_pair("token", &auth.token)
                .append_pair("username", &auth.username)
                .append_pair("isAdmin", if auth.is_admin { "true" } else { "false" });
            tracing::info!(provider = %provider, username = %auth.username, "Federated login succeeded");
        }
        Err(message) => {
            tracing::warn!(provider = %provider, error = %message, "Federated login failed");
            target.query_pairs_mut().append_pair("error", &message);
        }
    }
    Ok(Redirect::to(target.as_str()))
}

async fn complete_login(
    state: &AppState,
    provider: &str,
    params: CallbackParams,
) -> Result<AuthResponse, String> {
    if let Some(error) = params.error {
        return Err(OAuthError::Provider(params.error_description.unwrap_or(error)).to_string());
    }
    let returned_state = params.state.ok_or_else(|| OAuthError::InvalidState.to_string())?;
    state
        .oauth
        .validate_state(&returned_state, provider)
        .map_err(|e| e.to_string())?;
    let code = params.code.ok_or_else(|| OAuthError::MissingCode.to_string())?;

    let (registration, claims) = state
        .oauth
        .fetch_claims(provider, &code)
        .await
        .map_err(|e| e.to_string())?;

    let (user, _created) = IdentityResolver::new(&state.store)
        .resolve_federated(&registration.name, &registration.subject_claim, &claims)
        .map_err(|e| e.to_string())?;

    let principal = AuthenticatedUser::from_stored(&user);
    let token = state
        .tokens
        .issue(&principal.username)
        .map_err(|e| e.to_string())?;
    Ok(AuthResponse {
        token,
        is_admin: principal.is_admin(),
        username: principal.username,
    })
}
