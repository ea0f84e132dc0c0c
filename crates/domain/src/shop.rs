use std::sync::Arc;
use std::time::Duration;

use document_store::DocumentStore;

use crate::accounts::{AccountService, AccountSettings};
use crate::cart::{CartService, UserLocks};
use crate::catalog::CatalogStore;
use crate::ledger::OrderLedger;
use crate::notify::Mailer;
use crate::repository::DEFAULT_STORE_TIMEOUT;

/// Settings shared by the shop services.
#[derive(Debug, Clone)]
pub struct ShopSettings {
    /// Bound on every storage call.
    pub store_timeout: Duration,
    pub accounts: AccountSettings,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            accounts: AccountSettings::default(),
        }
    }
}

/// All shop services wired over one document store.
pub struct Shop<S: DocumentStore> {
    catalog: CatalogStore<S>,
    carts: CartService<S>,
    ledger: OrderLedger<S>,
    accounts: AccountService<S>,
}

impl<S: DocumentStore + Clone> Clone for Shop<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            carts: self.carts.clone(),
            ledger: self.ledger.clone(),
            accounts: self.accounts.clone(),
        }
    }
}

impl<S: DocumentStore + Clone> Shop<S> {
    pub fn new(store: S, mailer: Arc<dyn Mailer>, settings: ShopSettings) -> Self {
        let timeout = settings.store_timeout;
        let carts = CartService::new(store.clone(), timeout, UserLocks::new());
        Self {
            catalog: CatalogStore::new(store.clone(), timeout),
            ledger: OrderLedger::new(store.clone(), timeout, carts.clone()),
            carts,
            accounts: AccountService::new(store, timeout, mailer, settings.accounts),
        }
    }
}

impl<S: DocumentStore> Shop<S> {
    pub fn catalog(&self) -> &CatalogStore<S> {
        &self.catalog
    }

    pub fn carts(&self) -> &CartService<S> {
        &self.carts
    }

    pub fn ledger(&self) -> &OrderLedger<S> {
        &self.ledger
    }

    pub fn accounts(&self) -> &AccountService<S> {
        &self.accounts
    }
}
