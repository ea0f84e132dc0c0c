//! Domain layer for the shop backend.
//!
//! This crate provides:
//! - the product catalog with paginated listing
//! - per-user carts with serialized mutations
//! - the order ledger and checkout
//! - accounts (signup, login, password reset) and email notifications

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod money;
pub mod notify;
pub mod repository;
mod shop;

pub use accounts::{Account, AccountService, AccountSettings, PasswordReset};
pub use cart::{Cart, CartError, CartItem, CartLine, CartService, UserLocks};
pub use catalog::{CatalogStore, DEFAULT_PAGE_SIZE, Product, ProductPage};
pub use entity::Entity;
pub use error::DomainError;
pub use identity::RequestContext;
pub use ledger::{Checkout, Order, OrderError, OrderLedger, OrderLineItem, OrderState, Owner};
pub use money::Money;
pub use notify::{
    InMemoryMailer, LogMailer, Mailer, Notification, NotificationError, SmtpConfig, SmtpMailer,
};
pub use repository::{DEFAULT_STORE_TIMEOUT, Repository};
pub use shop::{Shop, ShopSettings};

pub use common::{OrderId, ProductId, UserId};
