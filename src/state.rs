// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{OAuthClients, OAuthError, TokenError, TokenService};
use crate::config::AppConfig;
use crate::orders::PricingPolicy;
use crate::storage::{Store, StoreError, DATABASE_FILE};

/// Errors raised while assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("token service: {0}")]
    Token(#[from] TokenError),

    #[error("oauth2 clients: {0}")]
    OAuth(#[from] OAuthError),
}

/// Shared handles, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub tokens: Arc<TokenService>,
    pub oauth: Arc<OAuthClients>,
    pub pricing: PricingPolicy,
    /// Front-end page receiving the result of a federated login
    pub oauth_redirect_uri: String,
}

impl AppState {
    pub fn new(
        store: Store,
        tokens: TokenService,
        oauth: OAuthClients,
        pricing: PricingPolicy,
        oauth_redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            oauth: Arc::new(oauth),
            pricing,
            oauth_redirect_uri: oauth_redirect_uri.into(),
        }
    }

    /// Open the database under `DATA_DIR` and build every service.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db_path = config.data_dir.join(DATABASE_FILE);
        let store = Store::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        let secret = config.jwt_secret.as_bytes();
        let tokens = TokenService::new(secret, config.jwt_expiration_ms)?;
        let oauth = OAuthClients::new(config.oauth_providers.clone(), secret)?;

        Ok(Self::new(
            store,
            tokens,
            oauth,
            config.pricing,
            config.oauth2_redirect_uri.clone(),
        ))
    }

    /// In-memory state with no federated providers.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::with_oauth(Vec::new())
    }

    /// In-memory state with the given federated providers.
    #[cfg(test)]
    pub fn with_oauth(providers: Vec<crate::auth::ProviderRegistration>) -> Self {
        const SECRET: &[u8] = b"test-signing-key-0123456789abcdef";
        Self::new(
            Store::in_memory().unwrap(),
            TokenService::new(SECRET, crate::auth::token::DEFAULT_TTL_MS).unwrap(),
            OAuthClients::new(providers, SECRET).unwrap(),
            PricingPolicy::default(),
            "http://localhost:5173/oauth2/redirect",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn from_config_creates_database_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested");
        let vars: HashMap<&str, String> = HashMap::from([
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef".to_string()),
            ("DATA_DIR", data_dir.display().to_string()),
            ("OAUTH_PROVIDERS", String::new()),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let state = AppState::from_config(&config).unwrap();
        assert!(data_dir.join(DATABASE_FILE).exists());
        assert!(state.store.health_check().is_ok());
        assert_eq!(state.oauth.provider_names().count(), 0);
    }
}
