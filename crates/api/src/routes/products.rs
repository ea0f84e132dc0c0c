//! Catalog browsing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::ProductId;
use document_store::DocumentStore;
use domain::Product;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::parse_id;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub price: String,
    pub image_url: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title,
            description: product.description,
            price_cents: product.price.cents(),
            price: product.price.to_string(),
            image_url: product.image_url,
        }
    }
}

#[derive(Serialize)]
pub struct ProductPageResponse {
    pub products: Vec<ProductResponse>,
    pub total_count: u64,
    pub current_page: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub next_page: u64,
    pub previous_page: u64,
    pub last_page: u64,
}

/// GET /products?page=N: one page of the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProductPageResponse>, ApiError> {
    let page = state
        .shop
        .catalog()
        .list_products(query.page.unwrap_or(1), state.page_size)
        .await?;

    Ok(Json(ProductPageResponse {
        total_count: page.total_count,
        current_page: page.current_page,
        has_next_page: page.has_next_page(),
        has_previous_page: page.has_previous_page(),
        next_page: page.next_page(),
        previous_page: page.previous_page(),
        last_page: page.last_page(),
        products: page.items.into_iter().map(ProductResponse::from).collect(),
    }))
}

/// GET /products/:id: product detail.
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    let product = state.shop.catalog().find_product(product_id).await?;
    Ok(Json(product.into()))
}
