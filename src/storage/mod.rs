// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb database file under `DATA_DIR`:
//!
//! ```text
//! ./data/
//!   storefront.redb   # users, roles, products, product images, orders, indexes, sequences
//! ```
//!
//! ## Important Notes
//!
//! - Every operation that must be atomic runs inside one write transaction
//! - Readers never block the writer and always see a committed snapshot
//! - Order lines are embedded in their order record

pub mod database;
pub mod repository;

pub use database::{Ledger, Store, StoreError, StoreResult};
pub use repository::{
    OrderRepository, ProductDraft, ProductImage, ProductRepository, StoredOrder, StoredOrderLine,
    StoredProduct, StoredRole, StoredUser, UserRepository,
};

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "storefront.redb";
