// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Product catalogue repository.
//!
//! The catalogue is plumbing around the order engine: lookup by id, listing,
//! keyword search and admin edits. Stock is only ever decremented by order
//! placement, inside the order's own write transaction.
//!
//! An uploaded image keeps its file name and MIME type on the product record;
//! the bytes live in `product_images` so listings never load them.

use chrono::NaiveDate;
use redb::{ReadableDatabase, ReadableTable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    decode, Ledger, Store, StoreError, StoreResult, PRODUCTS, PRODUCT_IMAGES,
};

const PRODUCT_SEQUENCE: &str = "product_id";

/// Product as persisted and returned by the catalogue endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredProduct {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    /// Unit price
    #[schema(value_type = String, example = "9.99")]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    pub product_available: bool,
    pub stock_quantity: u32,
    /// File name of the uploaded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    /// MIME type of the uploaded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
}

/// Uploaded product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Editable product fields (everything but the id and the image).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[schema(value_type = String, example = "9.99")]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default = "default_available")]
    pub product_available: bool,
    pub stock_quantity: u32,
}

fn default_available() -> bool {
    true
}

impl ProductDraft {
    fn into_product(self, id: u64) -> StoredProduct {
        StoredProduct {
            id,
            name: self.name,
            description: self.description,
            brand: self.brand,
            price: self.price,
            category: self.category,
            release_date: self.release_date,
            product_available: self.product_available,
            stock_quantity: self.stock_quantity,
            image_name: None,
            image_type: None,
        }
    }
}

impl StoredProduct {
    fn matches(&self, keyword: &str) -> bool {
        [&self.name, &self.description, &self.brand, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(keyword))
    }
}

/// Repository for catalogue operations.
pub struct ProductRepository<'a> {
    store: &'a Store,
}

impl<'a> ProductRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn get(&self, id: u64) -> StoreResult<Option<StoredProduct>> {
        let read_txn = self.store.db().begin_read()?;
        let table = read_txn.open_table(PRODUCTS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// All products, ordered by id.
    pub fn list(&self) -> StoreResult<Vec<StoredProduct>> {
        let read_txn = self.store.db().begin_read()?;
        let table = read_txn.open_table(PRODUCTS)?;
        let mut products = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            products.push(decode(value.value())?);
        }
        Ok(products)
    }

    /// Case-insensitive keyword search over name, description, brand and category.
    pub fn search(&self, keyword: &str) -> StoreResult<Vec<StoredProduct>> {
        let keyword = keyword.trim().to_lowercase();
        let products = self.list()?;
        if keyword.is_empty() {
            return Ok(products);
        }
        Ok(products.into_iter().filter(|p| p.matches(&keyword)).collect())
    }

    pub fn count(&self) -> StoreResult<usize> {
        Ok(self.list()?.len())
    }

    /// Image of a product; `None` when the product or its image is missing.
    pub fn image(&self, id: u64) -> StoreResult<Option<ProductImage>> {
        let read_txn = self.store.db().begin_read()?;
        let products = read_txn.open_table(PRODUCTS)?;
        let Some(value) = products.get(id)? else {
            return Ok(None);
        };
        let product: StoredProduct = decode(value.value())?;
        let (Some(name), Some(content_type)) = (product.image_name, product.image_type) else {
            return Ok(None);
        };

        let images = read_txn.open_table(PRODUCT_IMAGES)?;
        let data = images.get(id)?.map(|bytes| bytes.value().to_vec());
        Ok(data.map(|data| ProductImage {
            name,
            content_type,
            data,
        }))
    }

    /// Create a product with a freshly allocated id.
    pub fn create(&self, draft: ProductDraft) -> StoreResult<StoredProduct> {
        self.create_with_image(draft, None)
    }

    /// Create a product and store its image in the same transaction.
    pub fn create_with_image(
        &self,
        draft: ProductDraft,
        image: Option<ProductImage>,
    ) -> StoreResult<StoredProduct> {
        self.store.write(|ledger| {
            let mut product = insert_product(ledger, draft)?;
            if let Some(image) = image {
                attach_image(ledger, &mut product, image)?;
            }
            Ok(product)
        })
    }

    /// Replace an existing product's fields, keeping its image.
    pub fn update(&self, id: u64, draft: ProductDraft) -> StoreResult<StoredProduct> {
        self.update_with_image(id, draft, None)
    }

    /// Replace an existing product's fields. A new image replaces the old
    /// one; without one the current image is kept.
    pub fn update_with_image(
        &self,
        id: u64,
        draft: ProductDraft,
        image: Option<ProductImage>,
    ) -> StoreResult<StoredProduct> {
        self.store.write(|ledger| {
            let Some(existing) = ledger.get_product_json::<StoredProduct>(id)? else {
                return Err(StoreError::NotFound(format!("Product {id}")));
            };
            let mut product = draft.into_product(id);
            match image {
                Some(image) => attach_image(ledger, &mut product, image)?,
                None => {
                    product.image_name = existing.image_name;
                    product.image_type = existing.image_type;
                    ledger.put_product_json(id, &product)?;
                }
            }
            Ok(product)
        })
    }

    /// Returns `false` when no such product exists.
    pub fn delete(&self, id: u64) -> StoreResult<bool> {
        self.store.write(|ledger| {
            ledger.remove_product_image(id)?;
            ledger.remove_product(id)
        })
    }

    /// Create several products in one transaction.
    pub fn create_many(&self, drafts: Vec<ProductDraft>) -> StoreResult<Vec<StoredProduct>> {
        self.store.write(|ledger| {
            let mut created = Vec::with_capacity(drafts.len());
            for draft in drafts {
                created.push(insert_product(ledger, draft)?);
            }
            Ok(created)
        })
    }
}

fn insert_product(ledger: &mut Ledger<'_>, draft: ProductDraft) -> StoreResult<StoredProduct> {
    let id = ledger.next_sequence(PRODUCT_SEQUENCE)?;
    let product = draft.into_product(id);
    ledger.put_product_json(id, &product)?;
    Ok(product)
}

/// Store the bytes and record name and type on the product.
fn attach_image(
    ledger: &mut Ledger<'_>,
    product: &mut StoredProduct,
    image: ProductImage,
) -> StoreResult<()> {
    ledger.put_product_image(product.id, &image.data)?;
    product.image_name = Some(image.name);
    product.image_type = Some(image.content_type);
    ledger.put_product_json(product.id, product)
}
