// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Catalogue endpoints. Reads are public; edits are admin only.
//!
//! Create and update take either a JSON product, or a `multipart/form-data`
//! body with a JSON `product` part and an optional `imageFile` part.

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    orders::{is_money_amount, MONEY_SCALE},
    seed,
    state::AppState,
    storage::{ProductDraft, ProductImage, ProductRepository, StoreError, StoredProduct},
};

/// Upload limit for product bodies, image included.
pub const MAX_PRODUCT_BODY_BYTES: usize = 10 * 1024 * 1024;

const PRODUCT_PART: &str = "product";
const IMAGE_PART: &str = "imageFile";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Query parameters for product search.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive keyword matched against name, description, brand and category
    #[serde(default)]
    pub keyword: String,
}

/// Multipart body accepted by create and update.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpload {
    /// Product fields as JSON
    pub product: ProductDraft,
    /// Optional product image
    #[schema(value_type = Option<String>, format = Binary)]
    pub image_file: Option<Vec<u8>>,
}

/// Product fields plus an optional image, from a JSON or multipart body.
pub struct ProductSubmission {
    pub draft: ProductDraft,
    pub image: Option<ProductImage>,
}

impl<S> FromRequest<S> for ProductSubmission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(draft) = Json::<ProductDraft>::from_request(req, state)
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            return Ok(Self { draft, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        let mut draft = None;
        let mut image = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?
        {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(PRODUCT_PART) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                    let parsed = serde_json::from_slice::<ProductDraft>(&bytes).map_err(|e| {
                        ApiError::bad_request(format!("Invalid `{PRODUCT_PART}` part: {e}"))
                    })?;
                    draft = Some(parsed);
                }
                Some(IMAGE_PART) => {
                    let file_name = field.file_name().unwrap_or(IMAGE_PART).to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or(FALLBACK_CONTENT_TYPE)
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                    // Browsers send an empty part when no file was picked
                    if !data.is_empty() {
                        image = Some(ProductImage {
                            name: file_name,
                            content_type,
                            data: data.to_vec(),
                        });
                    }
                }
                other => tracing::debug!(part = ?other, "Ignoring unknown multipart part"),
            }
        }

        let draft = draft
            .ok_or_else(|| ApiError::bad_request(format!("Missing `{PRODUCT_PART}` part")))?;
        Ok(Self { draft, image })
    }
}

fn validate_draft(draft: &ProductDraft) -> Result<(), ApiError> {
    if draft.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name is required"));
    }
    if draft.price.is_sign_negative() {
        return Err(ApiError::bad_request("Price must not be negative"));
    }
    if !is_money_amount(draft.price) {
        return Err(ApiError::bad_request(format!(
            "Price must have at most {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// List every product.
#[utoipa::path(
    get,
    path = "/api/product",
    tag = "Products",
    responses(
        (status = 200, description = "All products", body = Vec<StoredProduct>)
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredProduct>>, ApiError> {
    Ok(Json(ProductRepository::new(&state.store).list()?))
}

/// Get one product.
#[utoipa::path(
    get,
    path = "/api/product/{id}",
    tag = "Products",
    params(("id" = u64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = StoredProduct),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<StoredProduct>, ApiError> {
    ProductRepository::new(&state.store)
        .get(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Product {id} not found")))
}

/// Raw bytes of a product's image.
#[utoipa::path(
    get,
    path = "/api/product/{id}/image",
    tag = "Products",
    params(("id" = u64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Product or image not found")
    )
)]
pub async fn get_product_image(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let image = ProductRepository::new(&state.store)
        .image(id)?
        .ok_or_else(|| ApiError::not_found(format!("No image for product {id}")))?;
    let content_type = HeaderValue::from_str(&image.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
    Ok(([(header::CONTENT_TYPE, content_type)], image.data).into_response())
}

/// Search products by keyword.
#[utoipa::path(
    get,
    path = "/api/product/search",
    tag = "Products",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching products", body = Vec<StoredProduct>)
    )
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<StoredProduct>>, ApiError> {
    let products = ProductRepository::new(&state.store).search(&params.keyword)?;
    tracing::debug!(keyword = %params.keyword, matches = products.len(), "Product search");
    Ok(Json(products))
}

/// Create a product. Admin only.
#[utoipa::path(
    post,
    path = "/api/product",
    tag = "Products",
    security(("bearer_auth" = [])),
    request_body(content(
        (ProductDraft = "application/json"),
        (ProductUpload = "multipart/form-data")
    )),
    responses(
        (status = 201, description = "Product created", body = StoredProduct),
        (status = 400, description = "Invalid product"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn create_product(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    ProductSubmission { draft, image }: ProductSubmission,
) -> Result<(StatusCode, Json<StoredProduct>), ApiError> {
    validate_draft(&draft)?;
    let product = ProductRepository::new(&state.store).create_with_image(draft, image)?;
    tracing::info!(
        product_id = product.id,
        admin = %admin.username,
        image = ?product.image_name,
        "Product created"
    );
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields. Admin only.
#[utoipa::path(
    put,
    path = "/api/product/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Product id")),
    request_body(content(
        (ProductDraft = "application/json"),
        (ProductUpload = "multipart/form-data")
    )),
    responses(
        (status = 200, description = "Product updated", body = StoredProduct),
        (status = 400, description = "Invalid product"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn update_product(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    ProductSubmission { draft, image }: ProductSubmission,
) -> Result<Json<StoredProduct>, ApiError> {
    validate_draft(&draft)?;
    let product = ProductRepository::new(&state.store)
        .update_with_image(id, draft, image)
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::not_found(format!("Product {id} not found")),
            other => other.into(),
        })?;
    tracing::info!(product_id = id, admin = %admin.username, "Product updated");
    Ok(Json(product))
}

/// Delete a product. Admin only.
#[utoipa::path(
    delete,
    path = "/api/product/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn delete_product(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    if !ProductRepository::new(&state.store).delete(id)? {
        return Err(ApiError::not_found(format!("Product {id} not found")));
    }
    tracing::info!(product_id = id, admin = %admin.username, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Add the sample catalogue. Admin only.
#[utoipa::path(
    post,
    path = "/api/product/initialize",
    tag = "Products",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Sample products added", body = Vec<StoredProduct>),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn initialize_products(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<StoredProduct>>), ApiError> {
    tracing::info!(admin = %admin.username, "Sample catalogue initialization requested");
    let created = seed::add_sample_products(&state.store)?;
    Ok((StatusCode::CREATED, Json(created)))
}
