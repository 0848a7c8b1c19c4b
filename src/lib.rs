//! ShoreStay API: cart, promo, and order/booking pipeline for a vacation
//! estate storefront.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use crate::{
    cache::SettingsCache,
    config::AppConfig,
    events::EventSender,
    services::{
        pricing::PricingPolicy, CartService, CatalogService, OrderService, PromoService,
        SettingsService,
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state. Cloned per request; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub settings_cache: Arc<SettingsCache>,
    pub cart: Arc<CartService>,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub promos: Arc<PromoService>,
    pub settings: Arc<SettingsService>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let policy = PricingPolicy::from_config(&config);
        let settings_cache = Arc::new(SettingsCache::new(Duration::from_secs(
            config.settings_cache_ttl_secs,
        )));

        let catalog = Arc::new(CatalogService::new(db.clone()));
        let promos = Arc::new(PromoService::new(db.clone(), event_sender.clone()));
        let cart = Arc::new(CartService::new(
            db.clone(),
            event_sender.clone(),
            promos.clone(),
            policy.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            event_sender.clone(),
            policy,
        ));
        let settings = Arc::new(SettingsService::new(
            db.clone(),
            event_sender.clone(),
            settings_cache.clone(),
        ));

        Self {
            db,
            config,
            event_sender,
            settings_cache,
            cart,
            catalog,
            orders,
            promos,
            settings,
        }
    }
}

/// All versioned API routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", handlers::cart::routes())
        .nest("/orders", handlers::orders::routes())
        .nest("/settings", handlers::settings::routes())
        .nest("/promo-codes", handlers::promos::routes())
        .merge(handlers::catalog::routes())
}

/// Full application router with health endpoints.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

async fn status() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

/// Liveness plus a database ping.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if db_ok { "healthy" } else { "degraded" },
            "database": if db_ok { "up" } else { "down" },
        })),
    )
}
