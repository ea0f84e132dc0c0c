//! Demo catalog for in-memory runs.

use document_store::DocumentStore;
use domain::{CatalogStore, DomainError, Money, Product};

const DEMO_PRODUCTS: &[(&str, &str, i64, &str)] = &[
    (
        "A Book",
        "A classic paperback, slightly dog-eared.",
        1299,
        "/images/book.png",
    ),
    (
        "Coffee Mug",
        "Holds exactly one large coffee.",
        850,
        "/images/mug.png",
    ),
    (
        "Desk Lamp",
        "Warm light for late-night reading.",
        2450,
        "/images/lamp.png",
    ),
    (
        "Notebook",
        "Dotted pages, lies flat.",
        550,
        "/images/notebook.png",
    ),
    (
        "Fountain Pen",
        "Fine nib, refillable.",
        3900,
        "/images/pen.png",
    ),
];

/// Adds a handful of products so the catalog is browsable out of the box.
pub async fn seed_demo_catalog<S: DocumentStore>(
    catalog: &CatalogStore<S>,
) -> Result<Vec<Product>, DomainError> {
    let mut products = Vec::with_capacity(DEMO_PRODUCTS.len());
    for (title, description, cents, image_url) in DEMO_PRODUCTS {
        let product = Product::new(*title, *description, Money::from_cents(*cents), *image_url)?;
        catalog.add_product(&product).await?;
        products.push(product);
    }
    tracing::info!(count = products.len(), "seeded demo catalog");
    Ok(products)
}
