// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    models::{OrderRequest, OrderResponse, UpdateStatusRequest},
    orders::OrderService,
    state::AppState,
};

/// Place an order for the current user.
///
/// Totals are computed server-side; monetary fields in the request are ignored.
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    request_body = OrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid order request"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn place_order(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = OrderService::new(&state.store, state.pricing).place_order(&user, &request)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders of the current user, newest first.
#[utoipa::path(
    get,
    path = "/api/orders/my",
    tag = "Orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's orders", body = Vec<OrderResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_orders(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = OrderService::new(&state.store, state.pricing).list_orders_for_user(&user)?;
    Ok(Json(orders))
}

/// Every order, newest first. Admin only.
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All orders", body = Vec<OrderResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn all_orders(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = OrderService::new(&state.store, state.pricing).list_all_orders()?;
    Ok(Json(orders))
}

/// Change an order's status. Admin only.
#[utoipa::path(
    put,
    path = "/api/orders/{order_id}/status",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("order_id" = String, Path, description = "Order id, e.g. ORD7K2M9QXA")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 204, description = "Status updated"),
        (status = 400, description = "Blank status"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn update_status(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<StatusCode, ApiError> {
    let updated =
        OrderService::new(&state.store, state.pricing).update_status(&order_id, &request.status)?;
    if !updated {
        return Err(ApiError::not_found(format!("Order {order_id} not found")));
    }
    tracing::debug!(order_id = %order_id, admin = %admin.username, "Status change applied");
    Ok(StatusCode::NO_CONTENT)
}
