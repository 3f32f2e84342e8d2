// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Start-up seeding: the sample catalogue and an optional bootstrap admin.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::auth::{IdentityError, IdentityResolver};
use crate::config::SeedAdmin;
use crate::storage::{ProductDraft, ProductRepository, Store, StoreResult, StoredProduct};

/// (name, description, brand, price in cents, category, release date, stock)
type SampleRow = (&'static str, &'static str, &'static str, i64, &'static str, (i32, u32, u32), u32);

const SAMPLE_PRODUCTS: &[SampleRow] = &[
    ("iPhone 15 Pro", "Latest iPhone with A17 Pro chip, titanium design, and advanced camera system", "Apple", 99999, "Smartphones", (2024, 9, 15), 50),
    ("Samsung Galaxy S24 Ultra", "Flagship Android phone with S Pen, 200MP camera, and AI features", "Samsung", 119999, "Smartphones", (2024, 1, 17), 40),
    ("MacBook Pro 16\"", "Powerful laptop with M3 Max chip, perfect for professionals", "Apple", 249999, "Laptops", (2024, 11, 7), 25),
    ("Dell XPS 15", "Premium Windows laptop with 4K display and powerful performance", "Dell", 179999, "Laptops", (2024, 5, 10), 30),
    ("Sony WH-1000XM5", "Industry-leading noise cancelling headphones with premium sound", "Sony", 39999, "Audio", (2024, 3, 15), 100),
    ("iPad Pro 12.9\"", "Ultimate iPad with M2 chip and stunning Liquid Retina XDR display", "Apple", 109999, "Tablets", (2024, 10, 18), 60),
    ("AirPods Pro 2", "Premium wireless earbuds with active noise cancellation", "Apple", 24999, "Audio", (2024, 9, 22), 150),
    ("PlayStation 5", "Next-gen gaming console with ultra-fast SSD and stunning graphics", "Sony", 49999, "Gaming", (2024, 11, 12), 20),
    ("Nintendo Switch OLED", "Portable gaming console with vibrant OLED screen", "Nintendo", 34999, "Gaming", (2024, 10, 8), 45),
    ("Canon EOS R6 Mark II", "Professional mirrorless camera with 24.2MP full-frame sensor", "Canon", 249999, "Cameras", (2024, 2, 14), 15),
];

/// The fixed sample catalogue.
pub fn sample_products() -> Vec<ProductDraft> {
    SAMPLE_PRODUCTS
        .iter()
        .map(|&(name, description, brand, cents, category, (y, m, d), stock)| ProductDraft {
            name: name.to_string(),
            description: description.to_string(),
            brand: brand.to_string(),
            price: Decimal::new(cents, 2),
            category: category.to_string(),
            release_date: NaiveDate::from_ymd_opt(y, m, d),
            product_available: true,
            stock_quantity: stock,
        })
        .collect()
}

/// Append the sample catalogue.
pub fn add_sample_products(store: &Store) -> StoreResult<Vec<StoredProduct>> {
    let created = ProductRepository::new(store).create_many(sample_products())?;
    tracing::info!(count = created.len(), "Sample products added");
    Ok(created)
}

/// Seed the sample catalogue only when the catalogue is empty.
pub fn seed_catalogue_if_empty(store: &Store) -> StoreResult<usize> {
    let existing = ProductRepository::new(store).count()?;
    if existing > 0 {
        tracing::info!(count = existing, "Catalogue already populated");
        return Ok(0);
    }
    Ok(add_sample_products(store)?.len())
}

/// Create the bootstrap admin unless the account already exists.
pub fn seed_admin(store: &Store, admin: &SeedAdmin) -> Result<bool, IdentityError> {
    let resolver = IdentityResolver::new(store);
    if resolver.lookup(&admin.username)?.is_some() {
        tracing::debug!(username = %admin.username, "Bootstrap admin already present");
        return Ok(false);
    }
    match resolver.register_admin(&admin.username, &admin.password, None) {
        Ok(_) => Ok(true),
        // Another instance created it between lookup and insert.
        Err(IdentityError::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};

    #[test]
    fn sample_catalogue_is_complete() {
        let products = sample_products();
        assert_eq!(products.len(), 10);
        assert_eq!(products[0].name, "iPhone 15 Pro");
        assert_eq!(products[0].price, Decimal::new(99999, 2));
        assert_eq!(products[9].stock_quantity, 15);
        assert!(products.iter().all(|p| p.release_date.is_some()));
    }

    #[test]
    fn seed_catalogue_only_when_empty() {
        let store = Store::in_memory().unwrap();
        assert_eq!(seed_catalogue_if_empty(&store).unwrap(), 10);
        assert_eq!(seed_catalogue_if_empty(&store).unwrap(), 0);
        assert_eq!(ProductRepository::new(&store).count().unwrap(), 10);
    }

    #[test]
    fn seed_admin_is_idempotent() {
        let store = Store::in_memory().unwrap();
        let admin = SeedAdmin {
            username: "admin".to_string(),
            password: "admin-password".to_string(),
        };
        assert!(seed_admin(&store, &admin).unwrap());
        assert!(!seed_admin(&store, &admin).unwrap());

        let user = IdentityResolver::new(&store).login("admin", "admin-password").unwrap();
        assert!(AuthenticatedUser::from_stored(&user).has_role(Role::Admin));
    }
}
