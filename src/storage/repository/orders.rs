// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order ledger.
//!
//! Orders are written exactly once, together with their lines and the stock
//! decrements that reserved them. Afterwards only the status changes.

use chrono::{DateTime, NaiveDate, Utc};
use redb::ReadableDatabase;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::database::{
    owner_range, Ledger, Store, StoreError, StoreResult, ORDERS, OWNER_ORDERS, USERS,
};
use super::products::StoredProduct;
use super::users::StoredUser;

/// One line of an order. References the product by id only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredOrderLine {
    pub product_id: u64,
    pub quantity: u32,
    /// Unit price × quantity at placement time
    pub line_total: Decimal,
}

/// Order as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredOrder {
    /// Human-readable unique id, e.g. `ORD7K2M9QXA`
    pub order_id: String,
    /// Username of the placing user
    pub owner: String,
    pub customer_name: String,
    pub email: String,
    pub status: String,
    pub order_date: NaiveDate,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<StoredOrderLine>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
}

/// Repository for order reads and status updates.
pub struct OrderRepository<'a> {
    store: &'a Store,
}

impl<'a> OrderRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn get(&self, order_id: &str) -> StoreResult<Option<StoredOrder>> {
        self.store.read_json(ORDERS, order_id)
    }

    /// Orders of one owner, newest first.
    pub fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<StoredOrder>> {
        let read_txn = self.store.db().begin_read()?;
        let index = read_txn.open_table(OWNER_ORDERS)?;
        let orders = read_txn.open_table(ORDERS)?;

        let (start, end) = owner_range(owner);
        let mut results = Vec::new();
        for entry in index.range(start.as_str()..end.as_str())? {
            let (_, order_id) = entry?;
            if let Some(value) = orders.get(order_id.value())? {
                results.push(serde_json::from_slice::<StoredOrder>(value.value())?);
            }
        }
        sort_newest_first(&mut results);
        Ok(results)
    }

    /// Every order, newest first.
    pub fn list_all(&self) -> StoreResult<Vec<StoredOrder>> {
        let mut results: Vec<StoredOrder> = self.store.scan_json(ORDERS)?;
        sort_newest_first(&mut results);
        Ok(results)
    }

    /// Overwrite the status of an order.
    ///
    /// Returns `false` (and writes nothing) when the order does not exist.
    pub fn set_status(&self, order_id: &str, status: &str) -> StoreResult<bool> {
        self.store.write(|ledger| {
            let Some(mut order) = ledger.get_json::<StoredOrder>(ORDERS, order_id)? else {
                return Ok(false);
            };
            order.status = status.to_string();
            ledger.put_json(ORDERS, order_id, &order)?;
            Ok(true)
        })
    }
}

fn sort_newest_first(orders: &mut [StoredOrder]) {
    orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
}

// =============================================================================
// Placement primitives (used inside the order's write transaction)
// =============================================================================

impl Ledger<'_> {
    pub fn user(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        self.get_json(USERS, username)
    }

    pub fn product(&self, id: u64) -> StoreResult<Option<StoredProduct>> {
        self.get_product_json(id)
    }

    pub fn save_product(&mut self, product: &StoredProduct) -> StoreResult<()> {
        self.put_product_json(product.id, product)
    }

    /// Insert an order and its owner index entry. Order ids are never reused.
    pub fn insert_order(&mut self, order: &StoredOrder) -> StoreResult<()> {
        if self.get_json::<StoredOrder>(ORDERS, &order.order_id)?.is_some() {
            return Err(StoreError::Conflict(format!("Order {}", order.order_id)));
        }
        self.put_json(ORDERS, &order.order_id, order)?;
        self.index_owner_order(&order.owner, &order.order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_order(order_id: &str, owner: &str, minutes_ago: i64) -> StoredOrder {
        StoredOrder {
            order_id: order_id.to_string(),
            owner: owner.to_string(),
            customer_name: "Test Customer".to_string(),
            email: "customer@example.com".to_string(),
            status: "PLACED".to_string(),
            order_date: Utc::now().date_naive(),
            placed_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
            lines: vec![StoredOrderLine {
                product_id: 1,
                quantity: 2,
                line_total: Decimal::from_str("19.98").unwrap(),
            }],
            subtotal: Decimal::from_str("19.98").unwrap(),
            shipping: Decimal::ZERO,
            tax: Decimal::from_str("2.00").unwrap(),
            total_amount: Decimal::from_str("21.98").unwrap(),
        }
    }

    fn insert(store: &Store, order: &StoredOrder) {
        store.write(|ledger| ledger.insert_order(order)).unwrap();
    }

    #[test]
    fn insert_and_get_order() {
        let store = Store::in_memory().unwrap();
        let order = sample_order("ORDAAAA0001", "alice", 0);
        insert(&store, &order);

        let repo = OrderRepository::new(&store);
        assert_eq!(repo.get("ORDAAAA0001").unwrap(), Some(order));
    }

    #[test]
    fn duplicate_order_id_rejected() {
        let store = Store::in_memory().unwrap();
        insert(&store, &sample_order("ORDDUP00001", "alice", 0));

        let result = store.write(|ledger| ledger.insert_order(&sample_order("ORDDUP00001", "bob", 0)));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(OrderRepository::new(&store).list_by_owner("bob").unwrap().is_empty());
    }

    #[test]
    fn list_by_owner_filters_and_sorts() {
        let store = Store::in_memory().unwrap();
        insert(&store, &sample_order("ORDOLD00001", "alice", 30));
        insert(&store, &sample_order("ORDNEW00001", "alice", 1));
        insert(&store, &sample_order("ORDBOB00001", "bob", 5));
        insert(&store, &sample_order("ORDPFX00001", "alice2", 5));

        let repo = OrderRepository::new(&store);
        let alice: Vec<String> = repo
            .list_by_owner("alice")
            .unwrap()
            .into_iter()
            .map(|o| o.order_id)
            .collect();
        assert_eq!(alice, vec!["ORDNEW00001", "ORDOLD00001"]);
        assert_eq!(repo.list_all().unwrap().len(), 4);
    }

    #[test]
    fn set_status_on_missing_order_returns_false() {
        let store = Store::in_memory().unwrap();
        insert(&store, &sample_order("ORDKEEP0001", "alice", 0));

        let repo = OrderRepository::new(&store);
        assert!(!repo.set_status("ORDMISSING1", "SHIPPED").unwrap());
        assert_eq!(repo.list_all().unwrap().len(), 1);
        assert_eq!(repo.get("ORDKEEP0001").unwrap().unwrap().status, "PLACED");
    }

    #[test]
    fn set_status_overwrites() {
        let store = Store::in_memory().unwrap();
        insert(&store, &sample_order("ORDSHIP0001", "alice", 0));

        let repo = OrderRepository::new(&store);
        assert!(repo.set_status("ORDSHIP0001", "SHIPPED").unwrap());
        assert_eq!(repo.get("ORDSHIP0001").unwrap().unwrap().status, "SHIPPED");
    }
}
