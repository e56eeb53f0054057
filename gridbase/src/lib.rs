//! # gridbase: self-service tables behind one data endpoint
//!
//! `gridbase` is a self-hostable table platform. Tenants define ad-hoc
//! tables and read/write them through a single generic HTTP endpoint,
//! authenticated per-database by an opaque API key, with every call audited.
//!
//! ## Overview
//!
//! Applications that just need "a table on the internet" (a waitlist, a
//! feedback form, a prototype backend) shouldn't need to stand up a schema,
//! an ORM and an API service first. `gridbase` gives each tenant logical
//! databases containing named tables whose rows are open JSON documents, and
//! exposes all of them through one wire contract.
//!
//! ### Request Flow
//!
//! A client posts an envelope to `/api/v1/data` naming an action
//! (select/insert/update/delete), a table, and an API key. The dispatcher
//! validates the envelope, resolves the key to its database (unknown and
//! inactive keys are indistinguishable 401s), resolves the table name within
//! that database, executes the action against the row store, and records an
//! audit entry with status and latency, spawned off the response path so
//! logging never slows a caller down. Updates are shallow merges: top-level
//! keys of the patch overwrite or extend the stored document, untouched keys
//! survive byte-for-byte.
//!
//! The management API under `/admin/api/v1/*` is the surface the dashboard
//! uses to create databases, tables, columns and keys, browse rows, and
//! inspect the audit log. It is authenticated by a trusted identity-proxy
//! header, never by API keys, and never consulted by the gateway.
//!
//! ### Storage
//!
//! All persistence goes through the [`db::handlers::Datastore`] trait, which
//! has two interchangeable deployments: an in-memory document store (used in
//! development and throughout the test suite) and PostgreSQL via sqlx, where
//! rows are JSONB and the shallow merge is a single `data || patch`
//! statement. Concurrent updates to the same row are deliberately not
//! serialized; the outcome is last-writer-wins.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use gridbase::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = gridbase::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     gridbase::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
mod crypto;
pub mod db;
pub mod errors;
pub mod gateway;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod test;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use db::handlers::{Datastore, MemStore, PgStore};
use openapi::ApiDoc;

pub use types::{ApiKeyId, ColumnId, DatabaseId, QueryLogId, RowId, TableId, UserId};

/// Application state shared across all request handlers: the storage backend
/// handle and the loaded configuration. Nothing else: the gateway is
/// stateless per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub config: Config,
}

/// Get the gridbase database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the CORS layer for the management API from configuration.
///
/// The gateway route is not affected: it always answers with an
/// unrestricted origin.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.auth.cors.allowed_origins;
    if origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let mut allowed = Vec::new();
    for origin in origins {
        allowed.push(origin.parse::<HeaderValue>()?);
    }
    Ok(CorsLayer::new().allow_origin(allowed).allow_methods(Any).allow_headers(Any))
}

/// Build the application router: the gateway endpoint, the management API,
/// health and docs routes, CORS and tracing middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // The data gateway: one endpoint, permissive CORS (OPTIONS preflight
    // answered with unrestricted origin)
    let gateway_routes = Router::new()
        .route("/api/v1/data", post(gateway::handle_query))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    // Management API
    let api_routes = Router::new()
        .route(
            "/databases",
            get(api::handlers::databases::list_databases).post(api::handlers::databases::create_database),
        )
        .route(
            "/databases/{id}",
            get(api::handlers::databases::get_database).delete(api::handlers::databases::delete_database),
        )
        .route(
            "/databases/{db_id}/tables",
            get(api::handlers::tables::list_tables).post(api::handlers::tables::create_table),
        )
        .route(
            "/databases/{db_id}/tables/{table_id}",
            delete(api::handlers::tables::delete_table),
        )
        .route(
            "/databases/{db_id}/tables/{table_id}/columns",
            get(api::handlers::tables::list_columns).post(api::handlers::tables::add_column),
        )
        .route(
            "/databases/{db_id}/tables/{table_id}/rows",
            get(api::handlers::rows::list_rows),
        )
        .route(
            "/databases/{db_id}/tables/{table_id}/rows/{row_id}",
            put(api::handlers::rows::replace_row).delete(api::handlers::rows::delete_row),
        )
        .route(
            "/api-keys",
            get(api::handlers::api_keys::list_api_keys).post(api::handlers::api_keys::create_api_key),
        )
        .route("/api-keys/{id}", delete(api::handlers::api_keys::delete_api_key))
        .route("/api-keys/{id}/regenerate", post(api::handlers::api_keys::regenerate_api_key))
        .route("/api-keys/{id}/activate", patch(api::handlers::api_keys::activate_api_key))
        .route("/api-keys/{id}/deactivate", patch(api::handlers::api_keys::deactivate_api_key))
        .route(
            "/query-logs",
            get(api::handlers::query_logs::list_query_logs).delete(api::handlers::query_logs::clear_query_logs),
        )
        .layer(create_cors_layer(&state.config)?)
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(gateway_routes)
        .nest("/admin/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the configured storage
///    backend (running migrations when it is PostgreSQL) and builds the
///    router
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    state: AppState,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (store, pool): (Arc<dyn Datastore>, Option<PgPool>) = match &config.database {
            config::DatabaseConfig::Memory => {
                info!("Using in-memory storage backend; data will be lost on shutdown");
                (Arc::new(MemStore::new()), None)
            }
            config::DatabaseConfig::External { url } => {
                info!("Using external PostgreSQL storage backend");
                let pool = PgPool::connect(url).await?;
                migrator().run(&pool).await?;
                (Arc::new(PgStore::new(pool.clone())), Some(pool))
            }
        };

        let state = AppState {
            store,
            config: config.clone(),
        };
        let router = build_router(&state)?;

        Ok(Self {
            router,
            config,
            state,
            pool,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, AppState) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.state)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "gridbase listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Close database connections
        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}
