// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Orders Module
//!
//! Checkout and order management on top of the embedded store.
//!
//! - `placement` - the order placement engine, order reads and status updates
//! - `pricing` - tax and shipping policy, fixed-point line totals

pub mod placement;
pub mod pricing;

pub use placement::{generate_order_id, OrderError, OrderService, STATUS_PLACED};
pub use pricing::{
    is_money_amount, AmountOverflow, OrderTotals, PricingPolicy, DEFAULT_TAX_RATE, MONEY_SCALE,
};
