//! The caller's cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use document_store::DocumentStore;
use domain::{CartLine, Money};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Identity, parse_id};

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub title: String,
    pub image_url: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_cents: i64,
    pub total: String,
}

impl From<Vec<CartLine>> for CartResponse {
    fn from(lines: Vec<CartLine>) -> Self {
        let total: Money = lines.iter().map(CartLine::line_total).sum();
        Self {
            lines: lines
                .into_iter()
                .map(|line| CartLineResponse {
                    line_total_cents: line.line_total().cents(),
                    product_id: line.product.id.to_string(),
                    title: line.product.title,
                    image_url: line.product.image_url,
                    quantity: line.quantity,
                    unit_price_cents: line.product.price.cents(),
                })
                .collect(),
            total_cents: total.cents(),
            total: total.to_string(),
        }
    }
}

/// GET /cart: the caller's cart joined with live product data.
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
) -> Result<Json<CartResponse>, ApiError> {
    let lines = state.shop.carts().list(ctx.user_id).await?;
    Ok(Json(lines.into()))
}

/// POST /cart: add a product (one unit unless a quantity is given).
#[tracing::instrument(skip(state, req))]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&req.product_id, "product id")?;
    state
        .shop
        .carts()
        .add_products(ctx.user_id, product_id, req.quantity.unwrap_or(1))
        .await?;
    list(State(state), Identity(ctx)).await
}

/// PUT /cart/:product_id: set a line's quantity; 0 removes it.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    state
        .shop
        .carts()
        .update_quantity(ctx.user_id, product_id, req.quantity)
        .await?;
    list(State(state), Identity(ctx)).await
}

/// DELETE /cart/:product_id: remove a line; absent lines are ignored.
#[tracing::instrument(skip(state))]
pub async fn remove<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    state
        .shop
        .carts()
        .remove_product(ctx.user_id, product_id)
        .await?;
    list(State(state), Identity(ctx)).await
}
