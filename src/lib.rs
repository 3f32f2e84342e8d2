// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storefront Server - Order Fulfillment & Identity Service
//!
//! Catalogue browsing, token authentication with local and OAuth2 federated
//! login, and transactional order placement with inventory adjustment,
//! backed by an embedded ACID store.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Tokens, identity resolution, request gate, OAuth2
//! - `orders` - Order placement engine and pricing
//! - `storage` - Embedded database (redb) and repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod orders;
pub mod seed;
pub mod state;
pub mod storage;

use tracing_subscriber::EnvFilter;

use config::LogFormat;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Install the global tracing subscriber.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
