//! HTTP API server for the order management backend.
//!
//! Provides REST endpoints for order placement, lookup, listing and status
//! updates plus the product catalog, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{OrderService, ProductCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
    pub catalog: ProductCatalog<S>,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: u32,
}

/// Builds the application state over `store`.
pub fn create_state<S: Store + Clone>(store: S, config: &Config) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::with_config(store.clone(), config.service_config()),
        catalog: ProductCatalog::new(store),
        default_page_size: config.default_page_size,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route("/products", get(routes::products::list::<S>))
        .route("/seed", post(routes::products::seed::<S>))
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
