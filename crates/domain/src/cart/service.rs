use std::time::Duration;

use common::{ProductId, UserId};
use document_store::{DocumentStore, Version};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use super::{Cart, CartError, UserLocks};
use crate::catalog::{CatalogStore, Product};
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::Repository;

/// A cart item joined with the live product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Quantity times the product's current price.
    pub fn line_total(&self) -> Money {
        self.product.price.multiply(self.quantity)
    }
}

/// Rejects a line whose total would not fit in [`Money`].
fn check_line_amount(product: &Product, quantity: u32) -> Result<(), CartError> {
    product
        .price
        .checked_multiply(quantity)
        .map(|_| ())
        .ok_or(CartError::AmountOverflow {
            product_id: product.id,
        })
}

/// Cart operations.
///
/// Every mutation for a user runs under that user's lock and is written
/// back with a version check before returning.
pub struct CartService<S: DocumentStore> {
    carts: Repository<S, Cart>,
    catalog: CatalogStore<S>,
    locks: UserLocks,
}

impl<S: DocumentStore + Clone> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            catalog: self.catalog.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S: DocumentStore + Clone> CartService<S> {
    pub fn new(store: S, timeout: Duration, locks: UserLocks) -> Self {
        Self {
            carts: Repository::new(store.clone(), timeout),
            catalog: CatalogStore::new(store, timeout),
            locks,
        }
    }
}

impl<S: DocumentStore> CartService<S> {
    /// Adds one unit of a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product is not in the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, DomainError> {
        self.add_products(user_id, product_id, 1).await
    }

    /// Adds `quantity` units of a product to the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn add_products(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, DomainError> {
        let _guard = self.lock(user_id).await;
        let product = self.catalog.find_product(product_id).await?;

        let (cart, new_quantity) = self
            .carts
            .upsert(
                &user_id.to_string(),
                || Cart::new(user_id),
                |cart| {
                    let new_quantity = cart.add_quantity(product_id, quantity)?;
                    check_line_amount(&product, new_quantity)?;
                    Ok(new_quantity)
                },
            )
            .await?;

        metrics::counter!("cart_mutations_total", "operation" => "add").increment(1);
        tracing::debug!(quantity = new_quantity, "product added to cart");
        Ok(cart)
    }

    /// Sets the quantity of a product; 0 removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        if quantity == 0 {
            return self.remove_product(user_id, product_id).await;
        }

        let _guard = self.lock(user_id).await;
        let product = self.catalog.find_product(product_id).await?;
        check_line_amount(&product, quantity)?;

        let (cart, ()) = self
            .carts
            .upsert(
                &user_id.to_string(),
                || Cart::new(user_id),
                |cart| {
                    cart.set_quantity(product_id, quantity);
                    Ok(())
                },
            )
            .await?;

        metrics::counter!("cart_mutations_total", "operation" => "update").increment(1);
        Ok(cart)
    }

    /// Removes a product's line. Absent products and carts are a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, DomainError> {
        let _guard = self.lock(user_id).await;

        let Some((mut cart, version)) = self.carts.find(&user_id.to_string()).await? else {
            return Ok(Cart::new(user_id));
        };
        if cart.remove_product(product_id) {
            self.carts.save(&cart, version).await?;
            metrics::counter!("cart_mutations_total", "operation" => "remove").increment(1);
        }
        Ok(cart)
    }

    /// Empties the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), DomainError> {
        let _guard = self.lock(user_id).await;

        match self.carts.find(&user_id.to_string()).await? {
            Some((cart, version)) if !cart.is_empty() => {
                self.clear_locked(user_id, version).await?;
                metrics::counter!("cart_mutations_total", "operation" => "clear").increment(1);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Lists the cart joined with live product data.
    ///
    /// Items whose product no longer exists in the catalog are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, DomainError> {
        let (lines, _) = self.list_versioned(user_id).await?;
        Ok(lines)
    }

    /// Acquires the user's cart lock.
    pub(crate) async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        self.locks.acquire(user_id).await
    }

    /// Joined cart lines plus the version they were read at.
    ///
    /// Callers holding the user's lock can pass the version to
    /// [`Self::clear_locked`] to clear exactly what they read.
    pub(crate) async fn list_versioned(
        &self,
        user_id: UserId,
    ) -> Result<(Vec<CartLine>, Version), DomainError> {
        let Some((cart, version)) = self.carts.find(&user_id.to_string()).await? else {
            return Ok((Vec::new(), Version::initial()));
        };

        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            match self.catalog.find_product(item.product_id).await {
                Ok(product) => lines.push(CartLine {
                    product,
                    quantity: item.quantity,
                }),
                Err(DomainError::NotFound { .. }) => {
                    tracing::warn!(
                        product_id = %item.product_id,
                        "cart references a product missing from the catalog, skipping"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok((lines, version))
    }

    /// Writes an empty cart, expecting the stored cart to be at `expected`.
    pub(crate) async fn clear_locked(
        &self,
        user_id: UserId,
        expected: Version,
    ) -> Result<(), DomainError> {
        self.carts.save(&Cart::new(user_id), expected).await?;
        Ok(())
    }

    pub fn catalog(&self) -> &CatalogStore<S> {
        &self.catalog
    }
}
