// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded storefront database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: username → serialized StoredUser
//! - `roles`: role name → serialized StoredRole
//! - `products`: product id → serialized StoredProduct
//! - `product_images`: product id → raw image bytes (name and type live on the product)
//! - `orders`: order id → serialized StoredOrder (lines embedded)
//! - `owner_orders`: composite key (owner\0order_id) → order id
//! - `counters`: sequence name → next value
//!
//! redb admits one write transaction at a time. Every find-or-create and
//! check-then-decrement in this crate runs inside a single write transaction,
//! which makes it an atomic read-modify-write against the store.

use std::path::Path;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// String-keyed table holding JSON-serialized records.
pub(crate) type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

pub(crate) const USERS: JsonTable = TableDefinition::new("users");

pub(crate) const ROLES: JsonTable = TableDefinition::new("roles");

pub(crate) const PRODUCTS: TableDefinition<u64, &[u8]> = TableDefinition::new("products");

pub(crate) const PRODUCT_IMAGES: TableDefinition<u64, &[u8]> =
    TableDefinition::new("product_images");

pub(crate) const ORDERS: JsonTable = TableDefinition::new("orders");

/// Key format: `owner \0 order_id` so one owner's orders form a contiguous range.
pub(crate) const OWNER_ORDERS: TableDefinition<&str, &str> = TableDefinition::new("owner_orders");

pub(crate) const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Key Helpers
// =============================================================================

/// Composite key for the owner → orders index.
pub(crate) fn owner_order_key(owner: &str, order_id: &str) -> String {
    format!("{owner}\0{order_id}")
}

/// Half-open range covering every index key of one owner.
pub(crate) fn owner_range(owner: &str) -> (String, String) {
    (format!("{owner}\0"), format!("{owner}\u{1}"))
}

pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

// =============================================================================
// Store
// =============================================================================

/// Embedded ACID storefront database.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Volatile store, used by tests and throwaway instances.
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(ROLES)?;
            let _ = write_txn.open_table(PRODUCTS)?;
            let _ = write_txn.open_table(PRODUCT_IMAGES)?;
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(OWNER_ORDERS)?;
            let _ = write_txn.open_table(COUNTERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`; aborts otherwise, so none of the writes
    /// made through the [`Ledger`] become visible.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Ledger<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let outcome = {
            let mut ledger = Ledger { txn: &txn };
            f(&mut ledger)
        };
        match outcome {
            Ok(value) => {
                txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                txn.abort().map_err(StoreError::from)?;
                Err(e)
            }
        }
    }

    /// Read one JSON value from a string-keyed table.
    pub(crate) fn read_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        match table.get(key)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read every JSON value of a string-keyed table, in key order.
    pub(crate) fn scan_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
    ) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let mut values = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            values.push(decode(value.value())?);
        }
        Ok(values)
    }

    /// Read check used by the readiness endpoint.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(COUNTERS)?;
        Ok(())
    }
}

// =============================================================================
// Ledger (write-transaction handle)
// =============================================================================

/// Handle over an open write transaction.
///
/// Each method opens the table it needs and releases it before returning, so
/// calls can be freely interleaved within one transaction.
pub struct Ledger<'t> {
    txn: &'t WriteTransaction,
}

impl Ledger<'_> {
    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let table = self.txn.open_table(table)?;
        let bytes = table.get(key)?.map(|value| value.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    pub(crate) fn put_json<T: Serialize>(
        &mut self,
        table: JsonTable,
        key: &str,
        value: &T,
    ) -> StoreResult<()> {
        let json = encode(value)?;
        let mut table = self.txn.open_table(table)?;
        table.insert(key, json.as_slice())?;
        Ok(())
    }

    pub(crate) fn get_product_json<T: DeserializeOwned>(&self, id: u64) -> StoreResult<Option<T>> {
        let table = self.txn.open_table(PRODUCTS)?;
        let bytes = table.get(id)?.map(|value| value.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    pub(crate) fn put_product_json<T: Serialize>(&mut self, id: u64, value: &T) -> StoreResult<()> {
        let json = encode(value)?;
        let mut table = self.txn.open_table(PRODUCTS)?;
        table.insert(id, json.as_slice())?;
        Ok(())
    }

    pub(crate) fn remove_product(&mut self, id: u64) -> StoreResult<bool> {
        let mut table = self.txn.open_table(PRODUCTS)?;
        let removed = table.remove(id)?.is_some();
        Ok(removed)
    }

    pub(crate) fn put_product_image(&mut self, id: u64, data: &[u8]) -> StoreResult<()> {
        let mut table = self.txn.open_table(PRODUCT_IMAGES)?;
        table.insert(id, data)?;
        Ok(())
    }

    pub(crate) fn remove_product_image(&mut self, id: u64) -> StoreResult<bool> {
        let mut table = self.txn.open_table(PRODUCT_IMAGES)?;
        let removed = table.remove(id)?.is_some();
        Ok(removed)
    }

    pub(crate) fn index_owner_order(&mut self, owner: &str, order_id: &str) -> StoreResult<()> {
        let key = owner_order_key(owner, order_id);
        let mut table = self.txn.open_table(OWNER_ORDERS)?;
        table.insert(key.as_str(), order_id)?;
        Ok(())
    }

    /// Allocate the next value of a named sequence (starting at 1).
    pub(crate) fn next_sequence(&mut self, name: &str) -> StoreResult<u64> {
        let mut table = self.txn.open_table(COUNTERS)?;
        let current = table.get(name)?.map(|v| v.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(name, next)?;
        Ok(next)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Record {
        value: u32,
    }

    #[test]
    fn open_on_disk_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("nested").join("test.redb")).unwrap();
        store.health_check().unwrap();
        let users: Vec<Record> = store.scan_json(USERS).unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn open_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Store::open(&blocker.join("test.redb"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn committed_write_is_visible() {
        let store = Store::in_memory().unwrap();
        store
            .write(|ledger| ledger.put_json(USERS, "alice", &Record { value: 7 }))
            .unwrap();

        let loaded: Option<Record> = store.read_json(USERS, "alice").unwrap();
        assert_eq!(loaded, Some(Record { value: 7 }));
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let store = Store::in_memory().unwrap();
        let result: StoreResult<()> = store.write(|ledger| {
            ledger.put_json(USERS, "bob", &Record { value: 1 })?;
            Err(StoreError::Conflict("forced".to_string()))
        });
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        let loaded: Option<Record> = store.read_json(USERS, "bob").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn sequences_increment() {
        let store = Store::in_memory().unwrap();
        let first = store.write(|l| l.next_sequence("product_id")).unwrap();
        let second = store.write(|l| l.next_sequence("product_id")).unwrap();
        assert_eq!((first, second), (1, 2));

        let other = store.write(|l| l.next_sequence("other")).unwrap();
        assert_eq!(other, 1);
    }

    #[test]
    fn owner_keys_sort_inside_owner_range() {
        let (start, end) = owner_range("alice");
        let key = owner_order_key("alice", "ORDZZZZZZZZ");
        assert!(start.as_str() <= key.as_str() && key.as_str() < end.as_str());

        let other = owner_order_key("alice2", "ORD00000000");
        assert!(!(start.as_str() <= other.as_str() && other.as_str() < end.as_str()));
    }
}
