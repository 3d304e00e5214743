//! Application startup and lifecycle management.

use crate::config::{ShopConfig, StoreBackend};
use crate::handlers;
use crate::services::{CatalogStore, MemoryStore, ShopDb, TicketStore};
use axum::{
    extract::Request,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ShopConfig,
    pub tickets: Arc<dyn TicketStore>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl AppState {
    /// Connects the configured backend. MongoDB indexes are created here.
    pub async fn from_config(config: ShopConfig) -> Result<Self, AppError> {
        let (tickets, catalog): (Arc<dyn TicketStore>, Arc<dyn CatalogStore>) =
            match config.store.backend {
                StoreBackend::Mongo => {
                    let db = ShopDb::connect(
                        config.mongodb.uri.expose_secret(),
                        &config.mongodb.database,
                    )
                    .await?;
                    db.initialize_indexes().await.map_err(|e| {
                        tracing::error!("Failed to initialize database indexes: {}", e);
                        e
                    })?;
                    let db = Arc::new(db);
                    (db.clone() as Arc<dyn TicketStore>, db as Arc<dyn CatalogStore>)
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory store; data is lost on restart");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone() as Arc<dyn TicketStore>, store as Arc<dyn CatalogStore>)
                }
            };

        Ok(Self {
            config,
            tickets,
            catalog,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/tickets",
            post(handlers::create_ticket).get(handlers::list_tickets),
        )
        .route(
            "/tickets/:id",
            get(handlers::get_ticket)
                .patch(handlers::update_ticket)
                .delete(handlers::delete_ticket),
        )
        .route("/tickets/:id/services", post(handlers::add_service))
        .route(
            "/tickets/:id/services/:index",
            delete(handlers::remove_service),
        )
        .route("/tickets/:id/payments", post(handlers::record_ticket_payment))
        .route(
            "/services",
            post(handlers::create_service).get(handlers::list_services),
        )
        .route(
            "/services/:id",
            get(handlers::get_service)
                .patch(handlers::update_service)
                .delete(handlers::delete_service),
        )
        .route("/analytics", get(handlers::get_analytics))
        .route_layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ShopConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config).await?;

        // port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(
            port = http_port,
            backend = ?state.config.store.backend,
            "Shop service listening"
        );

        Ok(Self {
            http_port,
            listener,
            state,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn ticket_store(&self) -> Arc<dyn TicketStore> {
        self.state.tickets.clone()
    }

    pub fn catalog_store(&self) -> Arc<dyn CatalogStore> {
        self.state.catalog.clone()
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
