// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{IdentityError, OAuthError, TokenError};
use crate::orders::OrderError;
use crate::storage::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Logs the detail; clients only see a generic message.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Internal server error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StoreError::Conflict(what) => ApiError::conflict(format!("{what} already exists")),
            other => ApiError::internal(other),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Unauthenticated => ApiError::unauthorized(err.to_string()),
            OrderError::ProductNotFound(_) => ApiError::not_found(err.to_string()),
            OrderError::InsufficientStock { .. } | OrderError::Conflict(_) => {
                ApiError::conflict(err.to_string())
            }
            OrderError::InvalidRequest(msg) => ApiError::bad_request(msg),
            OrderError::AmountOverflow(_) => ApiError::bad_request(err.to_string()),
            OrderError::Store(e) => ApiError::internal(e),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            IdentityError::Conflict(_) => ApiError::conflict(err.to_string()),
            IdentityError::InvalidInput(_) | IdentityError::UnresolvableClaims => {
                ApiError::bad_request(err.to_string())
            }
            IdentityError::Password(_) | IdentityError::Store(_) => ApiError::internal(err),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::internal(err)
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::UnknownProvider(_) => ApiError::not_found(err.to_string()),
            OAuthError::InvalidState | OAuthError::ProviderMismatch | OAuthError::MissingCode => {
                ApiError::bad_request(err.to_string())
            }
            OAuthError::Provider(_) | OAuthError::Http(_) => {
                tracing::warn!(error = %err, "OAuth2 provider call failed");
                ApiError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
            OAuthError::Url(_) | OAuthError::StateSigning(_) => ApiError::internal(err),
        }
    }
}
