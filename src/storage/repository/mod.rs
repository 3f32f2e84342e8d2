// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded store.
//!
//! Each repository wraps one entity family. Multi-entity atomic work goes
//! through [`Store::write`](super::Store::write) and the [`Ledger`](super::Ledger)
//! helpers instead.

pub mod orders;
pub mod products;
pub mod users;

pub use orders::{OrderRepository, StoredOrder, StoredOrderLine};
pub use products::{ProductDraft, ProductImage, ProductRepository, StoredProduct};
pub use users::{StoredRole, StoredUser, UserRepository};
