// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuance and verification.
//!
//! Tokens are compact HS256 JWTs carrying `sub`, `iat` and `exp`. They are not
//! stored anywhere: validity is a pure function of the signing key and the
//! clock. There is no revocation and no refresh.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::TokenClaims;

/// Minimum signing key length in bytes (256 bits).
pub const MIN_KEY_BYTES: usize = 32;

/// Default token lifetime (24 hours).
pub const DEFAULT_TTL_MS: i64 = 86_400_000;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signing key shorter than [`MIN_KEY_BYTES`]. Fatal at start-up.
    #[error("JWT secret must be at least {MIN_KEY_BYTES} bytes (256 bits), got {0}")]
    KeyTooShort(usize),

    /// `exp` has second granularity, so the lifetime must be whole seconds.
    #[error("token lifetime must be a positive whole number of seconds, got {0} ms")]
    InvalidTtl(i64),

    /// Malformed, badly signed or expired. Callers cannot tell which.
    #[error("invalid or expired token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and validates signed, time-limited bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service from a raw secret.
    ///
    /// Fails when the secret is shorter than 32 bytes or the TTL is not a
    /// positive multiple of 1000 ms.
    pub fn new(secret: &[u8], ttl_ms: i64) -> Result<Self, TokenError> {
        if secret.len() < MIN_KEY_BYTES {
            return Err(TokenError::KeyTooShort(secret.len()));
        }
        if ttl_ms <= 0 || ttl_ms % 1000 != 0 {
            return Err(TokenError::InvalidTtl(ttl_ms));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::milliseconds(ttl_ms),
        })
    }

    /// Issue a token for `subject`, valid from now for the configured TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and structure, then return the embedded subject.
    ///
    /// Expiry is not checked here; use [`TokenService::is_valid`] for that.
    pub fn subject_of(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.decode_claims(token)?.sub)
    }

    /// Signature and expiry check. Never errors; every failure is `false`.
    pub fn is_valid(&self, token: &str) -> bool {
        self.is_valid_at(token, Utc::now())
    }

    pub fn is_valid_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.verify_at(token, now).is_ok()
    }

    /// Full verification returning the claims. Used by the request gate.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims = self.decode_claims(token)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    /// Expiry is checked against an explicit clock by the callers, so the
    /// library's own wall-clock check is disabled here.
    fn decode_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                TokenError::Invalid
            })
    }
}
