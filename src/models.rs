// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize` and/or `Deserialize` plus
//! `ToSchema` for JSON handling and OpenAPI documentation. Field names are
//! camelCase on the wire.
//!
//! ## Money
//!
//! Monetary amounts are `rust_decimal::Decimal`. They serialize as strings
//! (`"19.98"`) and deserialize from either strings or JSON numbers.
//!
//! ## Model Categories
//!
//! - **Auth**: Login, registration and token responses
//! - **Orders**: Checkout requests and order projections

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Auth Models
// =============================================================================

/// Local login credentials.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Account registration request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Display name; defaults to the username.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub is_admin: bool,
}

/// A configured federated login provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    /// Relative URL that starts the login flow.
    pub authorization_url: String,
}

// =============================================================================
// Order Models
// =============================================================================

/// One requested order line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: u64,
    pub quantity: u32,
}

/// Checkout request.
///
/// The monetary fields are client-side estimates. They are never persisted;
/// the server recomputes every total.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer_name: String,
    pub email: String,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub shipping: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub total_amount: Option<Decimal>,
}

/// One line of an order projection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_name: String,
    pub quantity: u32,
    #[schema(value_type = String, example = "19.98")]
    pub line_total: Decimal,
}

/// Order projection returned by every order endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Human-readable order id, e.g. `ORD7K2M9QXA`.
    pub order_id: String,
    pub customer_name: String,
    pub email: String,
    pub status: String,
    pub order_date: NaiveDate,
    pub items: Vec<OrderItemResponse>,
    #[schema(value_type = String, example = "19.98")]
    pub subtotal: Decimal,
    #[schema(value_type = String, example = "0.00")]
    pub shipping: Decimal,
    #[schema(value_type = String, example = "2.00")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "21.98")]
    pub total_amount: Decimal,
}

/// Admin status change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Free-form status; stored uppercased.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_request_accepts_numeric_hints() {
        let json = r#"{
            "customerName": "Ada",
            "email": "ada@example.com",
            "items": [{"productId": 1, "quantity": 2}],
            "subtotal": 19.98,
            "totalAmount": "21.98"
        }"#;
        let request: OrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.items[0].product_id, 1);
        assert_eq!(request.subtotal, Some(Decimal::new(1998, 2)));
        assert_eq!(request.total_amount, Some(Decimal::new(2198, 2)));
        assert!(request.tax.is_none());
    }

    #[test]
    fn register_request_full_name_is_optional() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"username":"bob","password":"pw"}"#).unwrap();
        assert!(request.full_name.is_none());
    }

    #[test]
    fn auth_response_uses_camel_case() {
        let body = serde_json::to_value(AuthResponse {
            token: "t".into(),
            username: "u".into(),
            is_admin: true,
        })
        .unwrap();
        assert_eq!(body["isAdmin"], true);
    }
}
