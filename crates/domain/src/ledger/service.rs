use std::time::{Duration, Instant};

use common::{OrderId, UserId};
use document_store::DocumentStore;
use serde::Serialize;

use super::{Order, Owner};
use crate::cart::CartService;
use crate::error::DomainError;
use crate::identity::RequestContext;
use crate::repository::Repository;

/// Outcome of a checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub order: Order,
    /// False when the order was written but emptying the cart failed.
    /// The order stands; the leftover cart needs reconciliation.
    pub cart_cleared: bool,
}

/// Places orders from carts and serves them back to their owners.
pub struct OrderLedger<S: DocumentStore> {
    orders: Repository<S, Order>,
    carts: CartService<S>,
}

impl<S: DocumentStore + Clone> Clone for OrderLedger<S> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            carts: self.carts.clone(),
        }
    }
}

impl<S: DocumentStore> OrderLedger<S> {
    pub fn new(store: S, timeout: Duration, carts: CartService<S>) -> Self {
        Self {
            orders: Repository::new(store, timeout),
            carts,
        }
    }

    /// Turns the caller's cart into a placed order and empties the cart.
    ///
    /// Runs under the caller's cart lock, so no cart mutation interleaves
    /// between the snapshot and the clear. The order is written first; the
    /// cart is only cleared once the order is durable.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` if the cart has no items (no order is written)
    /// - `Validation` if a line or the order total does not fit in `Money`
    /// - storage errors or timeouts from reading the cart or writing the order
    ///   (the cart is left untouched)
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id))]
    pub async fn checkout(&self, ctx: &RequestContext) -> Result<Checkout, DomainError> {
        let started = Instant::now();
        let _guard = self.carts.lock(ctx.user_id).await;

        let (lines, cart_version) = self.carts.list_versioned(ctx.user_id).await?;
        let order = Order::place(Owner::from(ctx), &lines)?;
        self.orders.insert(&order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            items = order.items().len(),
            total = %order.total(),
            "order placed"
        );

        let cart_cleared = match self.carts.clear_locked(ctx.user_id, cart_version).await {
            Ok(()) => true,
            Err(e) => {
                metrics::counter!("checkout_cart_clear_failures_total").increment(1);
                tracing::error!(
                    order_id = %order.id(),
                    error = %e,
                    "order placed but cart could not be cleared; needs reconciliation"
                );
                false
            }
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        Ok(Checkout {
            order,
            cart_cleared,
        })
    }

    /// Lists a user's orders in the order they were placed.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        self.orders
            .query(Repository::<S, Order>::query_all().owner(user_id.to_string()))
            .await
    }

    /// Loads an order on behalf of `requester`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such order exists
    /// - `Forbidden` if it belongs to someone else
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Order, DomainError> {
        let order = self.orders.get(&order_id.to_string()).await?;
        if !order.is_owned_by(requester) {
            tracing::warn!(%order_id, %requester, "order requested by non-owner");
            return Err(DomainError::Forbidden { order_id });
        }
        Ok(order)
    }

    pub fn carts(&self) -> &CartService<S> {
        &self.carts
    }
}
