//! Product catalog: records, paginated listing and lookup.

mod page;
mod product;
mod store;

pub use page::ProductPage;
pub use product::Product;
pub use store::{CatalogStore, DEFAULT_PAGE_SIZE};
