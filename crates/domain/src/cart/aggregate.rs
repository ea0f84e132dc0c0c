use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::Entity;
use crate::error::DomainError;
use crate::ledger::OrderState;

/// Errors raised by cart invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    #[error("Quantity for {product_id} would exceed {max}")]
    QuantityOverflow { product_id: ProductId, max: u32 },

    #[error("Line total for {product_id} is too large")]
    AmountOverflow { product_id: ProductId },
}

impl From<CartError> for DomainError {
    fn from(err: CartError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// One cart line: a product reference and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's cart.
///
/// Invariants:
/// - at most one item per product
/// - every quantity is at least 1; an item dropping to zero is removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A cart is always open; it becomes an order only through checkout.
    pub fn state(&self) -> OrderState {
        OrderState::Open
    }

    /// Returns the quantity of a product, 0 if absent.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Adds one unit of a product.
    pub fn add_product(&mut self, product_id: ProductId) -> Result<u32, CartError> {
        self.add_quantity(product_id, 1)
    }

    /// Adds `quantity` units of a product, creating the line if needed.
    ///
    /// Returns the new quantity of the line.
    pub fn add_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<u32, CartError> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(CartError::InvalidQuantity { quantity })?;

        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(item) => {
                item.quantity =
                    item.quantity
                        .checked_add(quantity)
                        .ok_or(CartError::QuantityOverflow {
                            product_id,
                            max: u32::MAX,
                        })?;
                Ok(item.quantity)
            }
            None => {
                self.items.push(CartItem {
                    product_id,
                    quantity,
                });
                Ok(quantity)
            }
        }
    }

    /// Sets the quantity of a product; 0 removes the line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_product(product_id);
            return;
        }
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(item) => item.quantity = quantity,
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
    }

    /// Removes a product's line. Returns false if it was not in the cart.
    pub fn remove_product(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Entity for Cart {
    fn collection() -> &'static str {
        "carts"
    }

    fn entity_name() -> &'static str {
        "Cart"
    }

    fn document_id(&self) -> String {
        self.user_id.to_string()
    }

    fn owner(&self) -> Option<String> {
        Some(self.user_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_adds_increment_a_single_line() {
        let mut cart = Cart::new(UserId::new());
        let product = ProductId::new();

        cart.add_product(product).unwrap();
        cart.add_product(product).unwrap();
        let quantity = cart.add_product(product).unwrap();

        assert_eq!(quantity, 3);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(product), 3);
    }

    #[test]
    fn distinct_products_keep_insertion_order() {
        let mut cart = Cart::new(UserId::new());
        let a = ProductId::new();
        let b = ProductId::new();

        cart.add_product(a).unwrap();
        cart.add_product(b).unwrap();
        cart.add_product(a).unwrap();

        let ids: Vec<_> = cart.items().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut cart = Cart::new(UserId::new());
        let product = ProductId::new();

        assert_eq!(
            cart.add_quantity(product, 0),
            Err(CartError::InvalidQuantity { quantity: 0 })
        );
        assert_eq!(
            cart.add_quantity(product, -3),
            Err(CartError::InvalidQuantity { quantity: -3 })
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn setting_zero_removes_the_line() {
        let mut cart = Cart::new(UserId::new());
        let product = ProductId::new();
        cart.add_quantity(product, 4).unwrap();

        cart.set_quantity(product, 0);

        assert!(cart.is_empty());
    }

    #[test]
    fn removing_an_absent_product_is_a_no_op() {
        let mut cart = Cart::new(UserId::new());
        cart.add_product(ProductId::new()).unwrap();

        assert!(!cart.remove_product(ProductId::new()));
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn cart_is_stored_under_its_owner() {
        let user = UserId::new();
        let document = Cart::new(user).to_document().unwrap();
        assert_eq!(document.collection, "carts");
        assert_eq!(document.id, user.to_string());
        assert_eq!(document.owner, Some(user.to_string()));
    }
}
