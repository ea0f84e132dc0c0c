use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::OrderState;
use crate::cart::CartLine;
use crate::entity::Entity;
use crate::error::DomainError;
use crate::identity::RequestContext;
use crate::money::Money;

/// Errors raised while placing an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// A line with zero quantity reached the snapshot.
    #[error("Invalid quantity for {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// A line total does not fit in `Money`.
    #[error("Line total for {product_id} is too large")]
    LineTotalOverflow { product_id: ProductId },

    /// The order total does not fit in `Money`.
    #[error("Order total is too large")]
    TotalOverflow,
}

impl From<OrderError> for DomainError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NoItems => DomainError::EmptyCart,
            other => DomainError::Validation(other.to_string()),
        }
    }
}

/// Who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user_id: UserId,
    pub email: String,
}

impl From<&RequestContext> for Owner {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            user_id: ctx.user_id,
            email: ctx.email.clone(),
        }
    }
}

/// Frozen copy of a cart line at checkout time.
///
/// Never re-derived from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLineItem {
    pub fn from_cart_line(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            title: line.product.title.clone(),
            unit_price: line.product.price,
            quantity: line.quantity,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    owner: Owner,
    items: Vec<OrderLineItem>,
    created_at: DateTime<Utc>,
    state: OrderState,
}

impl Order {
    /// Snapshots joined cart lines into a new placed order.
    pub fn place(owner: Owner, lines: &[CartLine]) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        let mut total = Money::zero();
        for line in lines {
            let product_id = line.product.id;
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity { product_id });
            }
            let amount = line
                .product
                .price
                .checked_multiply(line.quantity)
                .ok_or(OrderError::LineTotalOverflow { product_id })?;
            total = total
                .checked_add(amount)
                .ok_or(OrderError::TotalOverflow)?;
        }

        Ok(Self {
            id: OrderId::new(),
            owner,
            items: lines.iter().map(OrderLineItem::from_cart_line).collect(),
            created_at: Utc::now(),
            state: OrderState::Placed,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Sum of all line totals. Exact, since placing an order rejects
    /// totals that do not fit.
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderLineItem::line_total).sum()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner.user_id == user_id
    }
}

impl Entity for Order {
    fn collection() -> &'static str {
        "orders"
    }

    fn entity_name() -> &'static str {
        "Order"
    }

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn owner(&self) -> Option<String> {
        Some(self.owner.user_id.to_string())
    }
}
