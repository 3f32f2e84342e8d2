// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local authentication endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::{AdminOnly, Auth, AuthError, AuthenticatedUser, IdentityResolver},
    error::ApiError,
    models::{AuthResponse, LoginRequest, ProviderInfo, RegisterRequest},
    state::AppState,
    storage::StoredUser,
};

fn token_response(state: &AppState, user: &StoredUser) -> Result<AuthResponse, ApiError> {
    let principal = AuthenticatedUser::from_stored(user);
    Ok(AuthResponse {
        token: state.tokens.issue(&principal.username)?,
        is_admin: principal.is_admin(),
        username: principal.username,
    })
}

/// Log in with username and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let user = IdentityResolver::new(&state.store).login(&request.username, &request.password)?;
    let response =
        token_response(&state, &user).map_err(|e| AuthError::InternalError(e.message))?;
    tracing::info!(username = %response.username, "User logged in");
    Ok(Json(response))
}

/// Register a regular account and log it in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = IdentityResolver::new(&state.store).register_user(
        &request.username,
        &request.password,
        request.full_name.as_deref(),
    )?;
    Ok(Json(token_response(&state, &user)?))
}

/// Register an administrator. Admin only.
#[utoipa::path(
    post,
    path = "/api/auth/register-admin",
    tag = "Auth",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Administrator created", body = AuthResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register_admin(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = IdentityResolver::new(&state.store).register_admin(
        &request.username,
        &request.password,
        request.full_name.as_deref(),
    )?;
    tracing::info!(created_by = %admin.username, username = %user.username, "Admin registered by admin");
    Ok(Json(token_response(&state, &user)?))
}

/// Get the current authenticated user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current principal", body = AuthenticatedUser),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<AuthenticatedUser> {
    Json(user)
}

/// List the configured federated login providers.
#[utoipa::path(
    get,
    path = "/api/auth/providers",
    tag = "Auth",
    responses(
        (status = 200, description = "Configured providers", body = Vec<ProviderInfo>)
    )
)]
pub async fn providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    Json(
        state
            .oauth
            .provider_names()
            .map(|name| ProviderInfo {
                name: name.to_string(),
                authorization_url: format!("/oauth2/authorization/{name}"),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{send, Call};
    use axum::http::StatusCode;
    use serde_json::json;

    fn admin_token(state: &AppState) -> String {
        IdentityResolver::new(&state.store)
            .register_admin("root", "root-password", Some("Root"))
            .unwrap();
        state.tokens.issue("root").unwrap()
    }

    #[tokio::test]
    async fn register_then_login_issues_token_for_username() {
        let state = AppState::for_tests();

        let (status, body) = send(
            &state,
            Call::post("/api/auth/register").json(json!({
                "username": "alice@example.com",
                "password": "alice-pass",
                "fullName": "Alice"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice@example.com");
        assert_eq!(body["isAdmin"], false);

        let (status, body) = send(
            &state,
            Call::post("/api/auth/login").json(json!({
                "username": "alice@example.com",
                "password": "alice-pass"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();
        assert_eq!(state.tokens.subject_of(token).unwrap(), "alice@example.com");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_401() {
        let state = AppState::for_tests();
        IdentityResolver::new(&state.store)
            .register_user("bob", "right-pass", None)
            .unwrap();

        let (status, body) = send(
            &state,
            Call::post("/api/auth/login").json(json!({"username": "bob", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_credentials");

        let (status, _) = send(
            &state,
            Call::post("/api/auth/login").json(json!({"username": "nobody", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_is_409() {
        let state = AppState::for_tests();
        let call = || {
            Call::post("/api/auth/register").json(json!({"username": "carol", "password": "pw"}))
        };
        assert_eq!(send(&state, call()).await.0, StatusCode::OK);
        assert_eq!(send(&state, call()).await.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_admin_requires_admin() {
        let state = AppState::for_tests();
        let body = json!({"username": "ops", "password": "ops-pass"});

        let (status, _) = send(&state, Call::post("/api/auth/register-admin").json(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        IdentityResolver::new(&state.store)
            .register_user("dave", "pw", None)
            .unwrap();
        let user_token = state.tokens.issue("dave").unwrap();
        let (status, _) = send(
            &state,
            Call::post("/api/auth/register-admin")
                .bearer(&user_token)
                .json(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let token = admin_token(&state);
        let (status, response) = send(
            &state,
            Call::post("/api/auth/register-admin").bearer(&token).json(body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["isAdmin"], true);
    }

    #[tokio::test]
    async fn me_returns_principal() {
        let state = AppState::for_tests();
        let token = admin_token(&state);

        let (status, body) = send(&state, Call::get("/api/auth/me").bearer(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "root");
        assert_eq!(body["displayName"], "Root");
        assert_eq!(body["roles"], json!(["ROLE_USER", "ROLE_ADMIN"]));

        let (status, _) = send(&state, Call::get("/api/auth/me")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn providers_lists_registered_names() {
        let state = AppState::for_tests();
        let (status, body) = send(&state, Call::get("/api/auth/providers")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
