//! HTTP API server with observability for the shop backend.
//!
//! A thin JSON adapter over the domain services: catalog browsing, the
//! caller's cart, checkout, orders with streamed PDF invoices, and account
//! credential flows. Structured logging via tracing and Prometheus metrics.

pub mod config;
pub mod demo;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use document_store::DocumentStore;
use domain::{AccountSettings, Mailer, Shop, ShopSettings};
use invoice::InvoiceRenderer;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub shop: Shop<S>,
    pub invoices: InvoiceRenderer<S>,
    pub page_size: u64,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route(
            "/cart",
            get(routes::cart::list::<S>).post(routes::cart::add::<S>),
        )
        .route(
            "/cart/{product_id}",
            axum::routing::put(routes::cart::update::<S>).delete(routes::cart::remove::<S>),
        )
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/invoice", get(routes::orders::invoice::<S>))
        .route("/accounts/signup", post(routes::accounts::signup::<S>))
        .route("/accounts/login", post(routes::accounts::login::<S>))
        .route("/accounts/reset", post(routes::accounts::request_reset::<S>))
        .route("/accounts/reset/{token}", get(routes::accounts::verify_reset::<S>))
        .route(
            "/accounts/new-password",
            post(routes::accounts::new_password::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a document store.
pub fn create_default_state<S: DocumentStore + Clone + 'static>(
    store: S,
    mailer: Arc<dyn Mailer>,
    config: &Config,
) -> Arc<AppState<S>> {
    let settings = ShopSettings {
        store_timeout: config.store_timeout,
        accounts: AccountSettings {
            reset_base_url: config.reset_base_url.clone(),
            ..AccountSettings::default()
        },
    };
    let shop = Shop::new(store, mailer, settings);
    let invoices = InvoiceRenderer::new(shop.ledger().clone(), config.invoice_dir.clone());

    Arc::new(AppState {
        shop,
        invoices,
        page_size: config.page_size,
    })
}
