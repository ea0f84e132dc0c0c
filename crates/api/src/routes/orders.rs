//! Checkout, order history and invoice endpoints.

use std::io;
use std::sync::Arc;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use common::OrderId;
use document_store::DocumentStore;
use domain::{Checkout, Order};
use futures_util::Stream;
use serde::Serialize;
use tokio::io::{AsyncReadExt, DuplexStream};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Identity, parse_id};

/// Bytes buffered between the invoice renderer and the response body.
const INVOICE_PIPE_CAPACITY: usize = 16 * 1024;
const INVOICE_READ_CHUNK: usize = 8 * 1024;

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub state: String,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub total: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.owner().user_id.to_string(),
            email: order.owner().email.clone(),
            state: order.state().to_string(),
            created_at: order.created_at().to_rfc3339(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    title: item.title.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    line_total_cents: item.line_total().cents(),
                })
                .collect(),
            total_cents: order.total().cents(),
            total: order.total().to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub cart_cleared: bool,
}

impl From<&Checkout> for CheckoutResponse {
    fn from(checkout: &Checkout) -> Self {
        Self {
            order: OrderResponse::from(&checkout.order),
            cart_cleared: checkout.cart_cleared,
        }
    }
}

/// POST /checkout: turn the caller's cart into an order.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let checkout = state.shop.ledger().checkout(&ctx).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(&checkout))))
}

/// GET /orders: the caller's orders, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.shop.ledger().list_orders(ctx.user_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id: one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let order = state.shop.ledger().get_order(order_id, ctx.user_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/:id/invoice: stream the order's PDF invoice.
///
/// The invoice is written to the invoice directory while it streams. A
/// client that disconnects early does not stop the file from being written.
#[tracing::instrument(skip(state))]
pub async fn invoice<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(ctx): Identity,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let invoice = state.invoices.prepare(order_id, ctx.user_id).await?;
    let file_name = invoice.file_name();

    let (writer, reader) = tokio::io::duplex(INVOICE_PIPE_CAPACITY);
    let renderer = state.invoices.clone();
    tokio::spawn(async move {
        if let Err(e) = renderer.render_to(&invoice, writer).await {
            tracing::error!(order_id = %invoice.order_id, error = %e, "invoice rendering failed");
        }
    });

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("inline; filename=\"{file_name}\""),
            ),
        ],
        Body::from_stream(read_chunks(reader)),
    )
        .into_response())
}

/// Turns the read half of the invoice pipe into a body stream.
fn read_chunks(reader: DuplexStream) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures_util::stream::unfold(Some(reader), |reader| async move {
        let mut reader = reader?;
        let mut buf = vec![0; INVOICE_READ_CHUNK];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}
