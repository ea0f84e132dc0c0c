use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainError;
use crate::money::Money;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Money,
    pub image_url: String,
}

impl Product {
    /// Creates a product with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the title is blank or the price is negative.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        image_url: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::Validation("product title is required".into()));
        }
        validate_price(price)?;

        Ok(Self {
            id: ProductId::new(),
            title,
            description: description.into(),
            price,
            image_url: image_url.into(),
        })
    }
}

pub(super) fn validate_price(price: Money) -> Result<(), DomainError> {
    if price.is_negative() {
        return Err(DomainError::Validation(format!(
            "price must not be negative, got {price}"
        )));
    }
    Ok(())
}

impl Entity for Product {
    fn collection() -> &'static str {
        "products"
    }

    fn entity_name() -> &'static str {
        "Product"
    }

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_price() {
        let result = Product::new("Book", "", Money::from_cents(-1), "");
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_blank_title() {
        let result = Product::new("  ", "", Money::from_cents(100), "");
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn free_products_are_allowed() {
        let product = Product::new("Sticker", "free", Money::zero(), "/img/sticker.png").unwrap();
        assert_eq!(product.price, Money::zero());
    }
}
