use std::time::Duration;

use common::ProductId;
use document_store::DocumentStore;

use super::product::validate_price;
use super::{Product, ProductPage};
use crate::error::DomainError;
use crate::money::Money;
use crate::repository::Repository;

/// Number of products per listing page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u64 = 2;

/// Product lookup and listing over the document store.
///
/// Prices are read from the store on every call; nothing is cached.
pub struct CatalogStore<S: DocumentStore> {
    products: Repository<S, Product>,
}

impl<S: DocumentStore + Clone> Clone for CatalogStore<S> {
    fn clone(&self) -> Self {
        Self {
            products: self.products.clone(),
        }
    }
}

impl<S: DocumentStore> CatalogStore<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self {
            products: Repository::new(store, timeout),
        }
    }

    /// Looks up a product by id.
    #[tracing::instrument(skip(self))]
    pub async fn find_product(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.products.get(&product_id.to_string()).await
    }

    /// Returns one page of products, in insertion order.
    ///
    /// Pages are numbered from 1; a page below 1 is treated as the first page.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, page: u64, page_size: u64) -> Result<ProductPage, DomainError> {
        if page_size == 0 {
            return Err(DomainError::Validation("page size must be positive".into()));
        }
        let current_page = page.max(1);
        let offset = (current_page - 1).saturating_mul(page_size);

        let total_count = self
            .products
            .count(Repository::<S, Product>::query_all())
            .await?;
        let items = self
            .products
            .query(
                Repository::<S, Product>::query_all()
                    .offset(usize::try_from(offset).unwrap_or(usize::MAX))
                    .limit(usize::try_from(page_size).unwrap_or(usize::MAX)),
            )
            .await?;

        Ok(ProductPage {
            items,
            total_count,
            current_page,
            page_size,
        })
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_product(&self, product: &Product) -> Result<(), DomainError> {
        validate_price(product.price)?;
        self.products.insert(product).await?;
        tracing::info!(title = %product.title, price = %product.price, "product added");
        Ok(())
    }

    /// Changes a product's price. Placed orders keep the price they were placed at.
    #[tracing::instrument(skip(self))]
    pub async fn reprice(&self, product_id: ProductId, price: Money) -> Result<Product, DomainError> {
        validate_price(price)?;
        let (product, previous) = self
            .products
            .update(&product_id.to_string(), |product| {
                Ok(std::mem::replace(&mut product.price, price))
            })
            .await?;
        tracing::info!(%previous, price = %product.price, "product repriced");
        Ok(product)
    }
}
