// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{authenticate, AuthenticatedUser, Role},
    models::{
        AuthResponse, LoginRequest, OrderItemRequest, OrderItemResponse, OrderRequest,
        OrderResponse, ProviderInfo, RegisterRequest, UpdateStatusRequest,
    },
    state::AppState,
    storage::{ProductDraft, StoredProduct},
};

pub mod auth;
pub mod health;
pub mod oauth;
pub mod orders;
pub mod products;

/// Build the full application router.
///
/// `allowed_origins` is the CORS allow-list; see `AppConfig::allowed_origins`.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/register-admin", post(auth::register_admin))
        .route("/auth/me", get(auth::me))
        .route("/auth/providers", get(auth::providers))
        // Catalogue
        .route(
            "/product",
            get(products::list_products)
                .post(products::create_product)
                .layer(DefaultBodyLimit::max(products::MAX_PRODUCT_BODY_BYTES)),
        )
        .route("/product/search", get(products::search_products))
        .route("/product/initialize", post(products::initialize_products))
        .route(
            "/product/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product)
                .layer(DefaultBodyLimit::max(products::MAX_PRODUCT_BODY_BYTES)),
        )
        .route("/product/{id}/image", get(products::get_product_image))
        // Orders
        .route(
            "/orders",
            get(orders::all_orders).post(orders::place_order),
        )
        .route("/orders/my", get(orders::my_orders))
        .route("/orders/{order_id}/status", put(orders::update_status));

    let app = Router::new()
        .nest("/api", api_routes)
        .route("/oauth2/authorization/{provider}", get(oauth::authorize))
        .route("/login/oauth2/code/{provider}", get(oauth::callback))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state);

    Router::new()
        .merge(app)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        auth::register_admin,
        auth::me,
        auth::providers,
        oauth::authorize,
        oauth::callback,
        products::list_products,
        products::get_product,
        products::get_product_image,
        products::search_products,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::initialize_products,
        orders::place_order,
        orders::my_orders,
        orders::all_orders,
        orders::update_status,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            AuthResponse,
            ProviderInfo,
            AuthenticatedUser,
            Role,
            StoredProduct,
            ProductDraft,
            products::ProductUpload,
            OrderItemRequest,
            OrderRequest,
            OrderItemResponse,
            OrderResponse,
            UpdateStatusRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Local login and registration"),
        (name = "OAuth2", description = "Federated login"),
        (name = "Products", description = "Catalogue"),
        (name = "Orders", description = "Checkout and order management"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
struct ApiDoc;

/// Router-level test helpers.
#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::IdentityResolver;
    use crate::state::AppState;

    pub(crate) struct Call {
        method: Method,
        uri: String,
        token: Option<String>,
        body: Option<(String, Vec<u8>)>,
    }

    impl Call {
        fn new(method: Method, uri: &str) -> Self {
            Self {
                method,
                uri: uri.to_string(),
                token: None,
                body: None,
            }
        }

        pub(crate) fn get(uri: &str) -> Self {
            Self::new(Method::GET, uri)
        }

        pub(crate) fn post(uri: &str) -> Self {
            Self::new(Method::POST, uri)
        }

        pub(crate) fn put(uri: &str) -> Self {
            Self::new(Method::PUT, uri)
        }

        pub(crate) fn delete(uri: &str) -> Self {
            Self::new(Method::DELETE, uri)
        }

        pub(crate) fn bearer(mut self, token: &str) -> Self {
            self.token = Some(token.to_string());
            self
        }

        pub(crate) fn json(self, body: Value) -> Self {
            self.raw("application/json", body.to_string().into_bytes())
        }

        pub(crate) fn raw(mut self, content_type: &str, body: Vec<u8>) -> Self {
            self.body = Some((content_type.to_string(), body));
            self
        }
    }

    pub(crate) async fn send_raw(state: &AppState, call: Call) -> Response {
        let mut request = Request::builder().method(call.method).uri(call.uri);
        if let Some(token) = call.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match call.body {
            Some((content_type, bytes)) => {
                request = request.header(header::CONTENT_TYPE, content_type);
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        super::router(state.clone(), &[])
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Send a request; the body is parsed as JSON (`Null` when empty).
    pub(crate) async fn send(state: &AppState, call: Call) -> (StatusCode, Value) {
        let response = send_raw(state, call).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub(crate) fn user_token(state: &AppState, username: &str) -> String {
        IdentityResolver::new(&state.store)
            .register_user(username, "user-password", None)
            .unwrap();
        state.tokens.issue(username).unwrap()
    }

    pub(crate) fn admin_token(state: &AppState) -> String {
        IdentityResolver::new(&state.store)
            .register_admin("admin", "admin-password", None)
            .unwrap();
        state.tokens.issue("admin").unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{send, send_raw, Call};
    use super::*;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests(), &["http://localhost:5173".to_string()]);
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let state = AppState::for_tests();
        let (status, body) = send(&state, Call::get("/api-doc/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/orders"].is_object());
        assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = send_raw(&AppState::for_tests(), Call::get("/health/live")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let app = router(AppState::for_tests(), &["https://shop.example.com".to_string()]);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/orders")
                    .header(header::ORIGIN, "https://shop.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
