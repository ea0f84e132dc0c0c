//! Per-user shopping cart.

mod aggregate;
mod locks;
mod service;

pub use aggregate::{Cart, CartError, CartItem};
pub use locks::UserLocks;
pub use service::{CartLine, CartService};
