//! Lifetrack API Server
//!
//! Tenant-isolated record keeping for personal "life tracker" data.
//! Every request is dispatched to exactly one handler, which works through
//! a session scoped to the tenant named in the `X-Tenant-Id` header.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use sea_orm::Database;
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod config;
mod domain;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;


use adapters::{InMemoryDocumentStore, PostgresDocumentStore};
use app::{
    register_crud, require_crud, Dispatcher, GoalSummaryHandler, GoalSummaryQuery,
    LoggingBehavior,
};
use config::Config;
use domain::aggregate::Aggregate;
use domain::entities::{Goal, Trip};
use domain::ports::DocumentStore;
use error::RegistryError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Register every handler the HTTP surface needs.
///
/// Fails if a handler is registered twice or if a route would dispatch a
/// request nothing handles.
pub fn build_dispatcher(store: Arc<dyn DocumentStore>) -> Result<Dispatcher, RegistryError> {
    let builder = Dispatcher::builder(store).behavior(LoggingBehavior);
    let builder = register_crud::<Goal>(builder)?;
    let builder = register_crud::<Trip>(builder)?;
    let builder = builder.register::<GoalSummaryQuery, _>(GoalSummaryHandler)?;

    let builder = require_crud::<Goal>(builder);
    let builder = require_crud::<Trip>(builder);
    builder.require::<GoalSummaryQuery>().build()
}

/// Build the HTTP router, without rate limiting
pub fn build_router(state: AppState) -> Router {
    let tenant_routes = Router::new()
        .route("/goals/summary", get(handlers::goal_summary))
        .merge(handlers::routes::<Goal>())
        .merge(handlers::routes::<Trip>())
        .layer(middleware::from_fn(auth::tenant_middleware));

    Router::new()
        // Health check (no tenant)
        .route("/health", get(health))
        .merge(tenant_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db = Database::connect(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");
            Arc::new(PostgresDocumentStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping records in memory");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    for collection in [Goal::COLLECTION, Trip::COLLECTION] {
        store
            .ensure_collection(collection)
            .await
            .with_context(|| format!("Failed to prepare collection {}", collection))?;
    }

    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lifetrack_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lifetrack API...");

    // Load configuration
    let config = Config::from_env();
    tracing::info!(
        database = config.uses_database(),
        seed = config.seed_demo_data,
        "Configuration loaded"
    );

    let store = connect_store(&config).await?;

    if config.seed_demo_data {
        app::seed_demo_data(store.clone())
            .await
            .context("Failed to seed demo data")?;
    }

    let dispatcher = build_dispatcher(store).context("Invalid handler registry")?;
    let state = AppState { dispatcher };

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .finish()
            .context("Invalid rate limit configuration")?,
    );

    let app = build_router(state).layer(GovernorLayer {
        config: governor_config,
    });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
