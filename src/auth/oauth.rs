// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 authorization-code federation.
//!
//! ## Flow
//!
//! 1. `GET /oauth2/authorization/{provider}` redirects to the provider with a
//!    signed `state` value (HS256 JWT, 10 minutes)
//! 2. The provider redirects back to `/login/oauth2/code/{provider}`
//! 3. The code is exchanged at the token endpoint, then the userinfo endpoint
//!    is queried with the access token
//! 4. The claims go to the identity resolver
//!
//! ## Provider Table
//!
//! Known providers (`google`, `github`) carry default scopes, endpoints and
//! subject claim. Every value can be overridden from the environment, which
//! also allows registering providers that are not in the table.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Lifetime of the signed `state` parameter (10 minutes).
pub const STATE_TTL_SECS: i64 = 600;

/// Timeout for calls to provider endpoints.
const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const FALLBACK_SCOPES: &[&str] = &["openid", "profile", "email"];

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Unknown OAuth2 provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid or expired OAuth2 state")]
    InvalidState,

    #[error("OAuth2 provider mismatch")]
    ProviderMismatch,

    #[error("Missing authorization code")]
    MissingCode,

    /// Error reported by the provider, either on the callback or by the token endpoint.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid provider URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to sign OAuth2 state: {0}")]
    StateSigning(String),
}

// =============================================================================
// Provider Table
// =============================================================================

/// Built-in defaults for a well-known provider.
#[derive(Debug)]
pub struct ProviderDefaults {
    pub name: &'static str,
    pub scopes: &'static [&'static str],
    pub authorization_uri: &'static str,
    pub token_uri: &'static str,
    pub userinfo_uri: &'static str,
    /// Claim holding the provider's stable user id
    pub subject_claim: &'static str,
}

pub const KNOWN_PROVIDERS: &[ProviderDefaults] = &[
    ProviderDefaults {
        name: "google",
        scopes: &["openid", "profile", "email"],
        authorization_uri: "https://accounts.google.com/o/oauth2/v2/auth",
        token_uri: "https://www.googleapis.com/oauth2/v4/token",
        userinfo_uri: "https://www.googleapis.com/oauth2/v3/userinfo",
        subject_claim: "sub",
    },
    ProviderDefaults {
        name: "github",
        scopes: &["read:user", "user:email"],
        authorization_uri: "https://github.com/login/oauth/authorize",
        token_uri: "https://github.com/login/oauth/access_token",
        userinfo_uri: "https://api.github.com/user",
        subject_claim: "id",
    },
];

pub fn defaults_for(name: &str) -> Option<&'static ProviderDefaults> {
    KNOWN_PROVIDERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// A fully resolved client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistration {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub authorization_uri: String,
    pub token_uri: String,
    pub userinfo_uri: String,
    pub subject_claim: String,
    pub redirect_uri: String,
}

/// Mask a client id for logging: first and last three characters only.
pub fn mask_client_id(client_id: &str) -> String {
    let chars: Vec<char> = client_id.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}***{tail}")
}

/// Build provider registrations from environment-style lookups.
///
/// `OAUTH_PROVIDERS` lists provider names (default `google,github`). For each
/// name `N`, reads `OAUTH_<N>_CLIENT_ID`, `OAUTH_<N>_CLIENT_SECRET` and the
/// optional overrides `OAUTH_<N>_SCOPES`, `_AUTHORIZATION_URI`, `_TOKEN_URI`,
/// `_USERINFO_URI`, `_SUBJECT_CLAIM`, `_REDIRECT_URI`. Providers without a
/// client id, or without endpoints, are skipped with a warning.
pub fn registrations_from_lookup<F>(lookup: F, public_base_url: &str) -> Vec<ProviderRegistration>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let names = get("OAUTH_PROVIDERS").unwrap_or_else(|| "google,github".to_string());
    let mut registrations = Vec::new();

    for name in names.split(',').map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) {
        let prefix = format!("OAUTH_{}_", name.to_uppercase().replace('-', "_"));
        let var = |suffix: &str| get(&format!("{prefix}{suffix}"));
        let defaults = defaults_for(&name);

        let Some(client_id) = var("CLIENT_ID") else {
            tracing::warn!(provider = %name, "OAuth2 provider not registered (no client id)");
            continue;
        };

        let endpoint = |suffix: &str, fallback: Option<&str>| {
            var(suffix).or_else(|| fallback.map(str::to_string))
        };
        let (Some(authorization_uri), Some(token_uri), Some(userinfo_uri)) = (
            endpoint("AUTHORIZATION_URI", defaults.map(|d| d.authorization_uri)),
            endpoint("TOKEN_URI", defaults.map(|d| d.token_uri)),
            endpoint("USERINFO_URI", defaults.map(|d| d.userinfo_uri)),
        ) else {
            tracing::warn!(provider = %name, "OAuth2 provider not registered (missing endpoints)");
            continue;
        };

        let scopes = match var("SCOPES") {
            Some(list) => list
                .split([',', ' '])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults
                .map(|d| d.scopes)
                .unwrap_or(FALLBACK_SCOPES)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let registration = ProviderRegistration {
            client_secret: var("CLIENT_SECRET").unwrap_or_default(),
            scopes,
            authorization_uri,
            token_uri,
            userinfo_uri,
            subject_claim: var("SUBJECT_CLAIM")
                .or_else(|| defaults.map(|d| d.subject_claim.to_string()))
                .unwrap_or_else(|| "id".to_string()),
            redirect_uri: var("REDIRECT_URI").unwrap_or_else(|| {
                format!(
                    "{}/login/oauth2/code/{name}",
                    public_base_url.trim_end_matches('/')
                )
            }),
            client_id,
            name,
        };
        tracing::info!(
            provider = %registration.name,
            client_id = %mask_client_id(&registration.client_id),
            "OAuth2 provider registered"
        );
        registrations.push(registration);
    }

    if registrations.is_empty() {
        tracing::warn!("No OAuth2 providers registered; federated login disabled");
    }
    registrations
}

// =============================================================================
// State Parameter
// =============================================================================

/// Claims of the signed `state` parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthStateClaims {
    pub provider: String,
    pub nonce: String,
    pub exp: i64,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Registered providers plus the HTTP client used to talk to them.
#[derive(Clone)]
pub struct OAuthClients {
    providers: BTreeMap<String, ProviderRegistration>,
    http: reqwest::Client,
    state_encoding: EncodingKey,
    state_decoding: DecodingKey,
}

impl OAuthClients {
    /// `state_secret` signs the `state` parameter (the token signing key).
    pub fn new(
        registrations: Vec<ProviderRegistration>,
        state_secret: &[u8],
    ) -> Result<Self, OAuthError> {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .user_agent(concat!("storefront-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            providers: registrations
                .into_iter()
                .map(|r| (r.name.clone(), r))
                .collect(),
            http,
            state_encoding: EncodingKey::from_secret(state_secret),
            state_decoding: DecodingKey::from_secret(state_secret),
        })
    }

    pub fn provider(&self, name: &str) -> Result<&ProviderRegistration, OAuthError> {
        self.providers
            .get(&name.to_lowercase())
            .ok_or_else(|| OAuthError::UnknownProvider(name.to_string()))
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Provider authorization URL with a fresh signed state.
    pub fn authorization_url(&self, provider: &str) -> Result<Url, OAuthError> {
        let registration = self.provider(provider)?;
        let state = self.create_state(&registration.name)?;
        let scope = registration.scopes.join(" ");
        let url = Url::parse_with_params(
            &registration.authorization_uri,
            [
                ("response_type", "code"),
                ("client_id", registration.client_id.as_str()),
                ("redirect_uri", registration.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state.as_str()),
            ],
        )?;
        Ok(url)
    }

    pub fn create_state(&self, provider: &str) -> Result<String, OAuthError> {
        let claims = OAuthStateClaims {
            provider: provider.to_string(),
            nonce: uuid::Uuid::new_v4().to_string(),
            exp: Utc::now().timestamp() + STATE_TTL_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.state_encoding)
            .map_err(|e| OAuthError::StateSigning(e.to_string()))
    }

    /// Verify a returned `state` and that it was issued for `provider`.
    pub fn validate_state(&self, state: &str, provider: &str) -> Result<OAuthStateClaims, OAuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        let claims = decode::<OAuthStateClaims>(state, &self.state_decoding, &validation)
            .map_err(|_| OAuthError::InvalidState)?
            .claims;
        if !claims.provider.eq_ignore_ascii_case(provider) {
            return Err(OAuthError::ProviderMismatch);
        }
        Ok(claims)
    }

    /// Exchange the code and fetch the userinfo claims.
    pub async fn fetch_claims(
        &self,
        provider: &str,
        code: &str,
    ) -> Result<(&ProviderRegistration, Map<String, Value>), OAuthError> {
        let registration = self.provider(provider)?;
        let access_token = self.exchange_code(registration, code).await?;
        let claims = self.fetch_userinfo(registration, &access_token).await?;
        Ok((registration, claims))
    }

    async fn exchange_code(
        &self,
        registration: &ProviderRegistration,
        code: &str,
    ) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(&registration.token_uri)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", registration.redirect_uri.as_str()),
                ("client_id", registration.client_id.as_str()),
                ("client_secret", registration.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: TokenEndpointResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(OAuthError::Provider(body.error_description.unwrap_or(error)));
        }
        if !status.is_success() {
            return Err(OAuthError::Provider(format!("HTTP {status} from token endpoint")));
        }
        body.access_token
            .ok_or_else(|| OAuthError::Provider("No access token in token response".to_string()))
    }

    async fn fetch_userinfo(
        &self,
        registration: &ProviderRegistration,
        access_token: &str,
    ) -> Result<Map<String, Value>, OAuthError> {
        let response = self
            .http
            .get(&registration.userinfo_uri)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::Provider(format!(
                "HTTP {} from userinfo endpoint",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn github() -> ProviderRegistration {
        registrations_from_lookup(
            lookup(&[
                ("OAUTH_PROVIDERS", "github"),
                ("OAUTH_GITHUB_CLIENT_ID", "gh-client-123456"),
                ("OAUTH_GITHUB_CLIENT_SECRET", "gh-secret"),
            ]),
            "http://localhost:8080",
        )
        .remove(0)
    }

    #[test]
    fn masks_client_ids() {
        assert_eq!(mask_client_id("abcdefghij"), "abc***hij");
        assert_eq!(mask_client_id("short"), "***");
    }

    #[test]
    fn known_providers_fill_defaults() {
        let gh = github();
        assert_eq!(gh.authorization_uri, "https://github.com/login/oauth/authorize");
        assert_eq!(gh.scopes, vec!["read:user", "user:email"]);
        assert_eq!(gh.subject_claim, "id");
        assert_eq!(gh.redirect_uri, "http://localhost:8080/login/oauth2/code/github");
    }

    #[test]
    fn providers_without_client_id_are_skipped() {
        let regs = registrations_from_lookup(
            lookup(&[("OAUTH_GOOGLE_CLIENT_ID", "google-client-id")]),
            "http://localhost:8080",
        );
        let names: Vec<_> = regs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["google"]);
        assert_eq!(regs[0].subject_claim, "sub");
    }

    #[test]
    fn unknown_provider_needs_explicit_endpoints() {
        let without = registrations_from_lookup(
            lookup(&[
                ("OAUTH_PROVIDERS", "acme"),
                ("OAUTH_ACME_CLIENT_ID", "acme-client-id"),
            ]),
            "http://localhost:8080",
        );
        assert!(without.is_empty());

        let with = registrations_from_lookup(
            lookup(&[
                ("OAUTH_PROVIDERS", "acme"),
                ("OAUTH_ACME_CLIENT_ID", "acme-client-id"),
                ("OAUTH_ACME_AUTHORIZATION_URI", "https://sso.acme.test/authorize"),
                ("OAUTH_ACME_TOKEN_URI", "https://sso.acme.test/token"),
                ("OAUTH_ACME_USERINFO_URI", "https://sso.acme.test/userinfo"),
                ("OAUTH_ACME_SCOPES", "openid,email"),
            ]),
            "http://localhost:8080/",
        );
        assert_eq!(with.len(), 1);
        assert_eq!(with[0].scopes, vec!["openid", "email"]);
        assert_eq!(with[0].subject_claim, "id");
        assert_eq!(with[0].redirect_uri, "http://localhost:8080/login/oauth2/code/acme");
    }

    #[test]
    fn authorization_url_carries_client_and_state() {
        let clients = OAuthClients::new(vec![github()], SECRET).unwrap();
        let url = clients.authorization_url("github").unwrap();
        assert_eq!(url.host_str(), Some("github.com"));

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "gh-client-123456");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "read:user user:email");
        clients.validate_state(&params["state"], "github").unwrap();
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let clients = OAuthClients::new(vec![], SECRET).unwrap();
        assert!(matches!(
            clients.authorization_url("google"),
            Err(OAuthError::UnknownProvider(_))
        ));
    }

    #[test]
    fn state_is_bound_to_provider_and_key() {
        let clients = OAuthClients::new(vec![github()], SECRET).unwrap();
        let state = clients.create_state("github").unwrap();

        assert!(matches!(
            clients.validate_state(&state, "google"),
            Err(OAuthError::ProviderMismatch)
        ));

        let other = OAuthClients::new(vec![], b"ffffffffffffffffffffffffffffffff").unwrap();
        assert!(matches!(
            other.validate_state(&state, "github"),
            Err(OAuthError::InvalidState)
        ));
    }

    #[test]
    fn expired_state_is_rejected() {
        let clients = OAuthClients::new(vec![github()], SECRET).unwrap();
        let claims = OAuthStateClaims {
            provider: "github".to_string(),
            nonce: "n".to_string(),
            exp: Utc::now().timestamp() - 600,
        };
        let stale = encode(&Header::new(Algorithm::HS256), &claims, &clients.state_encoding).unwrap();
        assert!(matches!(
            clients.validate_state(&stale, "github"),
            Err(OAuthError::InvalidState)
        ));
    }
}
