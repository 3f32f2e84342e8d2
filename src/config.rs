// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup; invalid values abort startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_BASE_URL` | Externally visible base URL (OAuth2 callbacks) | `http://localhost:<PORT>` |
//! | `DATA_DIR` | Directory holding the database file | `./data` |
//! | `JWT_SECRET` | Token signing key, at least 32 bytes | Required |
//! | `JWT_EXPIRATION_MS` | Token lifetime in milliseconds, a whole number of seconds | `86400000` |
//! | `TAX_RATE` | Tax rate applied to the subtotal | `0.10` |
//! | `SHIPPING_FLAT_FEE` | Flat shipping fee per order, at most 2 decimals | `0` |
//! | `FRONTEND_URL` | Front-end origin (CORS) | `http://localhost:5173` |
//! | `ADDITIONAL_ALLOWED_ORIGINS` | Extra CORS origins, comma-separated | empty |
//! | `OAUTH2_REDIRECT_URI` | Where federated logins land | `<FRONTEND_URL>/oauth2/redirect` |
//! | `OAUTH_PROVIDERS` | Federated providers to register | `google,github` |
//! | `OAUTH_<NAME>_*` | Per-provider settings, see [`crate::auth::oauth`] | |
//! | `SEED_ADMIN_USERNAME` | Bootstrap admin account (with password) | unset |
//! | `SEED_ADMIN_PASSWORD` | Bootstrap admin password | unset |
//! | `SEED_SAMPLE_PRODUCTS` | Seed the sample catalogue when empty | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::auth::oauth::{registrations_from_lookup, ProviderRegistration};
use crate::auth::token::{DEFAULT_TTL_MS, MIN_KEY_BYTES};
use crate::orders::{is_money_amount, PricingPolicy, DEFAULT_TAX_RATE, MONEY_SCALE};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
/// Directory holding `storefront.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_MS_ENV: &str = "JWT_EXPIRATION_MS";
pub const TAX_RATE_ENV: &str = "TAX_RATE";
pub const SHIPPING_FLAT_FEE_ENV: &str = "SHIPPING_FLAT_FEE";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const ADDITIONAL_ALLOWED_ORIGINS_ENV: &str = "ADDITIONAL_ALLOWED_ORIGINS";
pub const OAUTH2_REDIRECT_URI_ENV: &str = "OAUTH2_REDIRECT_URI";
pub const SEED_ADMIN_USERNAME_ENV: &str = "SEED_ADMIN_USERNAME";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const SEED_SAMPLE_PRODUCTS_ENV: &str = "SEED_SAMPLE_PRODUCTS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Bootstrap admin credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Fully parsed service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiration_ms: i64,
    pub pricing: PricingPolicy,
    pub frontend_url: String,
    pub additional_allowed_origins: Vec<String>,
    pub oauth2_redirect_uri: String,
    pub oauth_providers: Vec<ProviderRegistration>,
    pub seed_admin: Option<SeedAdmin>,
    pub seed_sample_products: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        if jwt_secret.len() < MIN_KEY_BYTES {
            return Err(ConfigError::Invalid {
                name: JWT_SECRET_ENV,
                reason: format!(
                    "must be at least {MIN_KEY_BYTES} bytes (256 bits), got {}",
                    jwt_secret.len()
                ),
            });
        }
        let jwt_expiration_ms = parse_or(get(JWT_EXPIRATION_MS_ENV), JWT_EXPIRATION_MS_ENV, DEFAULT_TTL_MS)?;
        if jwt_expiration_ms <= 0 || jwt_expiration_ms % 1000 != 0 {
            return Err(ConfigError::Invalid {
                name: JWT_EXPIRATION_MS_ENV,
                reason: "must be a positive whole number of seconds".to_string(),
            });
        }

        let tax_rate: Decimal = parse_or(get(TAX_RATE_ENV), TAX_RATE_ENV, DEFAULT_TAX_RATE)?;
        let shipping: Decimal = parse_or(get(SHIPPING_FLAT_FEE_ENV), SHIPPING_FLAT_FEE_ENV, Decimal::ZERO)?;
        for (name, value) in [(TAX_RATE_ENV, tax_rate), (SHIPPING_FLAT_FEE_ENV, shipping)] {
            if value.is_sign_negative() {
                return Err(ConfigError::Invalid {
                    name,
                    reason: "must not be negative".to_string(),
                });
            }
        }
        if !is_money_amount(shipping) {
            return Err(ConfigError::Invalid {
                name: SHIPPING_FLAT_FEE_ENV,
                reason: format!("must have at most {MONEY_SCALE} decimal places"),
            });
        }

        let frontend_url = get(FRONTEND_URL_ENV)
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let additional_allowed_origins = get(ADDITIONAL_ALLOWED_ORIGINS_ENV)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let oauth2_redirect_uri = get(OAUTH2_REDIRECT_URI_ENV)
            .unwrap_or_else(|| format!("{frontend_url}/oauth2/redirect"));
        url::Url::parse(&oauth2_redirect_uri).map_err(|e| ConfigError::Invalid {
            name: OAUTH2_REDIRECT_URI_ENV,
            reason: e.to_string(),
        })?;

        let public_base_url = get(PUBLIC_BASE_URL_ENV)
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let oauth_providers = registrations_from_lookup(&lookup, &public_base_url);

        let seed_admin = match (get(SEED_ADMIN_USERNAME_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(username), Some(password)) => Some(SeedAdmin { username, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: SEED_ADMIN_USERNAME_ENV,
                    reason: format!("{SEED_ADMIN_USERNAME_ENV} and {SEED_ADMIN_PASSWORD_ENV} must be set together"),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            public_base_url,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            jwt_secret,
            jwt_expiration_ms,
            pricing: PricingPolicy::new(tax_rate, shipping),
            frontend_url,
            additional_allowed_origins,
            oauth2_redirect_uri,
            oauth_providers,
            seed_admin,
            seed_sample_products: parse_bool(get(SEED_SAMPLE_PRODUCTS_ENV)),
            log_format,
        })
    }

    /// CORS allow-list: the front-end URL plus any extra origins. Local dev
    /// ports are added when no localhost origin is configured.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        origins.extend(self.additional_allowed_origins.iter().cloned());
        if !origins.iter().any(|o| o.contains("localhost")) {
            origins.push("http://localhost:5173".to_string());
            origins.push("http://localhost:5174".to_string());
        }
        origins.dedup();
        origins
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>) -> bool {
    matches!(
        value.map(|v| v.to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
