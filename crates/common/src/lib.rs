//! Identifier types shared by every crate of the shop backend.

mod types;

pub use types::{OrderId, ProductId, UserId};
