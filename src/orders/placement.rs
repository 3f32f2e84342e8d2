// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order placement engine.
//!
//! One checkout runs inside a single write transaction:
//!
//! 1. Resolve the principal to its stored user
//! 2. For each line in request order: load the product, check and decrement
//!    stock, price the line at the current unit price
//! 3. Compute subtotal, tax, shipping and total
//! 4. Insert the order with its lines and owner index entry
//!
//! Any failure aborts the transaction, so neither the order nor any stock
//! decrement becomes visible.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;

use super::pricing::{line_total, AmountOverflow, OrderTotals, PricingPolicy};
use crate::auth::AuthenticatedUser;
use crate::models::{OrderItemResponse, OrderRequest, OrderResponse};
use crate::storage::{
    OrderRepository, ProductRepository, Store, StoreError, StoredOrder, StoredOrderLine,
};

/// Order id prefix.
pub const ORDER_ID_PREFIX: &str = "ORD";

const ORDER_ID_SUFFIX_LEN: usize = 8;
const ORDER_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Status of every freshly placed order.
pub const STATUS_PLACED: &str = "PLACED";

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// No principal, or the principal's user no longer exists.
    #[error("Authentication is required to place an order")]
    Unauthenticated,

    #[error("Product not found: {0}")]
    ProductNotFound(u64),

    #[error("Insufficient stock for product: {name} (id {product_id}, requested {requested}, available {available})")]
    InsufficientStock {
        product_id: u64,
        name: String,
        requested: u32,
        available: u32,
    },

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    AmountOverflow(#[from] AmountOverflow),

    #[error("Duplicate order id: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => OrderError::Conflict(what),
            other => OrderError::Store(other),
        }
    }
}

/// `ORD` followed by 8 random uppercase alphanumerics.
pub fn generate_order_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
        .map(|_| ORDER_ID_CHARSET[rng.gen_range(0..ORDER_ID_CHARSET.len())] as char)
        .collect();
    format!("{ORDER_ID_PREFIX}{suffix}")
}

/// Orchestrates checkout, order reads and status changes.
pub struct OrderService<'a> {
    store: &'a Store,
    pricing: PricingPolicy,
}

impl<'a> OrderService<'a> {
    pub fn new(store: &'a Store, pricing: PricingPolicy) -> Self {
        Self { store, pricing }
    }

    /// Place an order for `principal`. All lines succeed together or none do.
    pub fn place_order(
        &self,
        principal: &AuthenticatedUser,
        request: &OrderRequest,
    ) -> Result<OrderResponse, OrderError> {
        validate_request(request)?;
        let order_id = generate_order_id();

        let (order, product_names) = self.store.write(|ledger| -> Result<_, OrderError> {
            let owner = ledger
                .user(&principal.username)?
                .ok_or(OrderError::Unauthenticated)?;

            let mut lines = Vec::with_capacity(request.items.len());
            let mut product_names = BTreeMap::new();
            for item in &request.items {
                let mut product = ledger
                    .product(item.product_id)?
                    .ok_or(OrderError::ProductNotFound(item.product_id))?;

                let remaining = product.stock_quantity.checked_sub(item.quantity).ok_or_else(|| {
                    OrderError::InsufficientStock {
                        product_id: product.id,
                        name: product.name.clone(),
                        requested: item.quantity,
                        available: product.stock_quantity,
                    }
                })?;
                tracing::debug!(
                    product_id = product.id,
                    stock_before = product.stock_quantity,
                    stock_after = remaining,
                    "Reserving stock"
                );
                product.stock_quantity = remaining;
                ledger.save_product(&product)?;

                lines.push(StoredOrderLine {
                    product_id: product.id,
                    quantity: item.quantity,
                    line_total: line_total(product.price, item.quantity)?,
                });
                product_names.insert(product.id, product.name);
            }

            let totals = self.pricing.totals(lines.iter().map(|line| line.line_total))?;
            let now = Utc::now();
            let order = StoredOrder {
                order_id: order_id.clone(),
                owner: owner.username,
                customer_name: request.customer_name.trim().to_string(),
                email: request.email.trim().to_string(),
                status: STATUS_PLACED.to_string(),
                order_date: now.date_naive(),
                placed_at: now,
                lines,
                subtotal: totals.subtotal,
                shipping: totals.shipping,
                tax: totals.tax,
                total_amount: totals.total_amount,
            };
            ledger.insert_order(&order)?;
            Ok((order, product_names))
        })?;

        log_hint_mismatch(&order_id, request, &totals_of(&order));
        tracing::info!(
            order_id = %order.order_id,
            owner = %order.owner,
            lines = order.lines.len(),
            total = %order.total_amount,
            "Order placed"
        );
        Ok(project(&order, &product_names))
    }

    /// Orders of the principal, newest first.
    pub fn list_orders_for_user(
        &self,
        principal: &AuthenticatedUser,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = OrderRepository::new(self.store).list_by_owner(&principal.username)?;
        self.project_all(&orders)
    }

    /// Every order, newest first. Callers restrict this to admins.
    pub fn list_all_orders(&self) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = OrderRepository::new(self.store).list_all()?;
        self.project_all(&orders)
    }

    /// Store `status` uppercased. Returns `false` when the order does not exist.
    ///
    /// The status vocabulary is open; anything non-blank is accepted.
    pub fn update_status(&self, order_id: &str, status: &str) -> Result<bool, OrderError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(OrderError::InvalidRequest("Status is required".into()));
        }
        let status = status.to_uppercase();
        let updated = OrderRepository::new(self.store).set_status(order_id, &status)?;
        if updated {
            tracing::info!(order_id = %order_id, status = %status, "Order status updated");
        } else {
            tracing::debug!(order_id = %order_id, "Status update for unknown order");
        }
        Ok(updated)
    }

    fn project_all(&self, orders: &[StoredOrder]) -> Result<Vec<OrderResponse>, OrderError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let names: BTreeMap<u64, String> = ProductRepository::new(self.store)
            .list()?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        Ok(orders.iter().map(|order| project(order, &names)).collect())
    }
}

fn validate_request(request: &OrderRequest) -> Result<(), OrderError> {
    if request.items.is_empty() {
        return Err(OrderError::InvalidRequest(
            "Order must contain at least one item".into(),
        ));
    }
    if let Some(item) = request.items.iter().find(|item| item.quantity == 0) {
        return Err(OrderError::InvalidRequest(format!(
            "Quantity for product {} must be positive",
            item.product_id
        )));
    }
    Ok(())
}

fn totals_of(order: &StoredOrder) -> OrderTotals {
    OrderTotals {
        subtotal: order.subtotal,
        shipping: order.shipping,
        tax: order.tax,
        total_amount: order.total_amount,
    }
}

/// Client totals are advisory. Differences are logged and otherwise ignored.
fn log_hint_mismatch(order_id: &str, request: &OrderRequest, totals: &OrderTotals) {
    let differs = |hint: Option<Decimal>, actual: Decimal| hint.is_some_and(|h| h != actual);
    if differs(request.subtotal, totals.subtotal)
        || differs(request.shipping, totals.shipping)
        || differs(request.tax, totals.tax)
        || differs(request.total_amount, totals.total_amount)
    {
        tracing::warn!(
            order_id = %order_id,
            client_subtotal = ?request.subtotal,
            client_total = ?request.total_amount,
            subtotal = %totals.subtotal,
            total = %totals.total_amount,
            "Client-supplied totals differ from computed totals; using computed values"
        );
    }
}

fn project(order: &StoredOrder, product_names: &BTreeMap<u64, String>) -> OrderResponse {
    OrderResponse {
        order_id: order.order_id.clone(),
        customer_name: order.customer_name.clone(),
        email: order.email.clone(),
        status: order.status.clone(),
        order_date: order.order_date,
        items: order
            .lines
            .iter()
            .map(|line| OrderItemResponse {
                product_name: product_names
                    .get(&line.product_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Product {} (removed)", line.product_id)),
                quantity: line.quantity,
                line_total: line.line_total,
            })
            .collect(),
        subtotal: order.subtotal,
        shipping: order.shipping,
        tax: order.tax,
        total_amount: order.total_amount,
    }
}
