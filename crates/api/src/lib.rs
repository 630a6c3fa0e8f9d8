//! HTTP API server with observability for the commerce backend.
//!
//! Wires the order, tracking, and stock services behind an axum router
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use common::{InMemoryNotifier, UserId};
use domain::{
    InMemoryOrderRepository, InMemoryProductCatalog, InMemoryUserDirectory,
    InMemoryVendorDirectory, OrderService, PostgresOrderRepository, User,
};
use inventory::{InMemoryStockStore, PostgresStockStore, StockService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracking::{InMemoryTrackingStore, PostgresTrackingStore, TrackingService};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: OrderService,
    pub tracking: TrackingService,
    pub stock: StockService,
}

/// Handles on the in-memory backends, for seeding in tests and local runs.
pub struct InMemoryBackends {
    pub repository: Arc<InMemoryOrderRepository>,
    pub tracking_store: Arc<InMemoryTrackingStore>,
    pub stock_store: Arc<InMemoryStockStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub catalog: Arc<InMemoryProductCatalog>,
    pub vendors: Arc<InMemoryVendorDirectory>,
    pub notifier: Arc<InMemoryNotifier>,
    /// Recipient of escalations and low-stock alerts.
    pub ops_contact: UserId,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Orders
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/stats", get(routes::orders::stats))
        .route("/orders/user/{id}", get(routes::orders::list_for_user))
        .route("/orders/vendor/{id}", get(routes::orders::list_for_vendor))
        .route(
            "/orders/{id}",
            get(routes::orders::get).delete(routes::orders::remove),
        )
        .route("/orders/{id}/status", patch(routes::orders::update_status))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/return", post(routes::orders::request_return))
        .route("/orders/{id}/escalate", post(routes::orders::escalate))
        .route(
            "/orders/{id}/payment/begin",
            post(routes::orders::begin_payment),
        )
        .route(
            "/orders/{id}/payment/settle",
            post(routes::orders::settle_payment),
        )
        .route(
            "/orders/{id}/payment/refund",
            post(routes::orders::refund_payment),
        )
        // Tracking ledger
        .route("/order-tracking", post(routes::tracking::create))
        .route("/order-tracking/stats", get(routes::tracking::stats))
        .route("/order-tracking/{order_id}/ship", put(routes::tracking::ship))
        .route(
            "/order-tracking/{order_id}/deliver",
            put(routes::tracking::deliver),
        )
        .route(
            "/order-tracking/{order_id}/cancel",
            put(routes::tracking::cancel),
        )
        .route(
            "/order-tracking/{order_id}/history",
            get(routes::tracking::history),
        )
        .route(
            "/order-tracking/{order_id}/latest",
            get(routes::tracking::latest),
        )
        // Stock ledger
        .route("/inventory", post(routes::inventory::create))
        .route(
            "/inventory/bulk-import",
            post(routes::inventory::bulk_import),
        )
        .route("/inventory/low-stock", get(routes::inventory::list_low_stock))
        .route(
            "/inventory/out-of-stock",
            get(routes::inventory::list_out_of_stock),
        )
        .route(
            "/inventory/product/{id}",
            get(routes::inventory::list_for_product),
        )
        .route(
            "/inventory/vendor/{id}",
            get(routes::inventory::list_for_vendor),
        )
        .route("/inventory/{id}", get(routes::inventory::get))
        .route(
            "/inventory/{id}/adjust-stock",
            post(routes::inventory::adjust_stock),
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

/// Creates application state backed entirely by in-memory stores.
///
/// The user/product/vendor directories are in-memory stand-ins for the
/// external services that own those records.
pub fn create_in_memory_state() -> (Arc<AppState>, InMemoryBackends) {
    let repository = Arc::new(InMemoryOrderRepository::new());
    let tracking_store = Arc::new(InMemoryTrackingStore::new());
    let stock_store = Arc::new(InMemoryStockStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let catalog = Arc::new(InMemoryProductCatalog::new());
    let vendors = Arc::new(InMemoryVendorDirectory::new());
    let notifier = Arc::new(InMemoryNotifier::new());

    let ops_contact = users.insert(User {
        id: UserId::new(),
        name: "Operations".to_string(),
        email: "ops@example.com".to_string(),
        is_active: true,
    });

    let orders = OrderService::new(
        repository.clone(),
        users.clone(),
        catalog.clone(),
        vendors.clone(),
        notifier.clone(),
    )
    .with_ops_contact(ops_contact);
    let tracking = TrackingService::new(
        repository.clone(),
        tracking_store.clone(),
        notifier.clone(),
    );
    let stock =
        StockService::new(stock_store.clone(), notifier.clone()).with_ops_contact(ops_contact);

    let state = Arc::new(AppState {
        orders,
        tracking,
        stock,
    });

    (
        state,
        InMemoryBackends {
            repository,
            tracking_store,
            stock_store,
            users,
            catalog,
            vendors,
            notifier,
            ops_contact,
        },
    )
}

/// Creates application state with Postgres-backed order, tracking, and
/// stock storage.
///
/// Directory lookups stay in-memory: users, products, and vendors belong
/// to external services reached through the narrow lookup traits.
pub async fn create_postgres_state(database_url: &str) -> Result<Arc<AppState>, sqlx::Error> {
    let pool = sqlx::PgPool::connect(database_url).await?;

    let repository = PostgresOrderRepository::new(pool.clone());
    repository
        .run_migrations()
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

    let repository = Arc::new(repository);
    let tracking_store = Arc::new(PostgresTrackingStore::new(pool.clone()));
    let stock_store = Arc::new(PostgresStockStore::new(pool));
    let users = Arc::new(InMemoryUserDirectory::new());
    let catalog = Arc::new(InMemoryProductCatalog::new());
    let vendors = Arc::new(InMemoryVendorDirectory::new());
    let notifier = Arc::new(InMemoryNotifier::new());

    let orders = OrderService::new(
        repository.clone(),
        users,
        catalog,
        vendors,
        notifier.clone(),
    );
    let tracking = TrackingService::new(repository, tracking_store, notifier.clone());
    let stock = StockService::new(stock_store, notifier);

    Ok(Arc::new(AppState {
        orders,
        tracking,
        stock,
    }))
}
