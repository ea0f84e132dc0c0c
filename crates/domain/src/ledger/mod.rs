//! Order ledger: append-only placed orders and checkout.

mod model;
mod service;
mod state;

pub use model::{Order, OrderError, OrderLineItem, Owner};
pub use service::{Checkout, OrderLedger};
pub use state::OrderState;
