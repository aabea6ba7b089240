//! HTTP surface of the public catalog.
//!
//! Routes are mounted under `server.base_path`:
//!
//! | Route                   | Purpose                           |
//! |-------------------------|-----------------------------------|
//! | `GET /agents`           | visible agents, newest first      |
//! | `GET /agents/categories`| categories among visible agents   |
//! | `GET /agents/_debug`    | counts for operators (admin)      |
//! | `GET /agents/_schema`   | stored field names (admin)        |
//! | `GET /ping`             | liveness, not rate limited        |

pub mod admin;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod rate_limit;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::middleware;
use axum::routing::get;
use http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogError, CatalogSettings};
use crate::config::{Config, ConfigError, ServerConfig, StorageConfig};
use crate::error::Result;
use crate::ratelimit::{
    InMemoryRateLimitStore, RateLimitBackend, RateLimitStore, RateLimiter, SqliteRateLimitStore,
};
use crate::storage::{
    CatalogFixture, Database, InMemoryCatalogStore, SqliteCatalogStore, StorageResult,
};
use error::ApiError;
use logging::RequestLoggerLayer;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    catalog: std::result::Result<Arc<Catalog>, Arc<str>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    trust_forwarded_for: bool,
    admin_token: Option<Arc<str>>,
    agents_cache: HeaderValue,
    categories_cache: HeaderValue,
}

impl AppState {
    /// State serving `catalog`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured `Cache-Control` value is not a
    /// valid header value.
    pub fn new(catalog: Arc<Catalog>, config: &Config) -> std::result::Result<Self, ConfigError> {
        Self::build(Ok(catalog), config)
    }

    /// State for a catalog that could not be opened. Catalog routes answer
    /// `SERVICE_NOT_READY` until the process is restarted.
    ///
    /// # Errors
    ///
    /// Same as [`AppState::new`].
    pub fn unavailable(
        reason: impl Into<String>,
        config: &Config,
    ) -> std::result::Result<Self, ConfigError> {
        Self::build(Err(Arc::from(reason.into())), config)
    }

    fn build(
        catalog: std::result::Result<Arc<Catalog>, Arc<str>>,
        config: &Config,
    ) -> std::result::Result<Self, ConfigError> {
        let header = |name: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|_| ConfigError::Invalid(format!("{name} is not a valid header value")))
        };
        Ok(Self {
            catalog,
            rate_limiter: None,
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
            admin_token: config.admin.token.as_deref().map(Arc::from),
            agents_cache: header("cache.agents", &config.cache.agents)?,
            categories_cache: header("cache.categories", &config.cache.categories)?,
        })
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn catalog(&self) -> std::result::Result<&Arc<Catalog>, ApiError> {
        self.catalog
            .as_ref()
            .map_err(|reason| CatalogError::ServiceNotReady(reason.to_string()).into())
    }

    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn trust_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    pub fn agents_cache_control(&self) -> &HeaderValue {
        &self.agents_cache
    }

    pub fn categories_cache_control(&self) -> &HeaderValue {
        &self.categories_cache
    }
}

/// Builds the router with its middleware stack.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let public = Router::new()
        .route("/agents", get(handlers::list_agents))
        .route("/agents/categories", get(handlers::list_categories))
        .route("/agents/_debug", get(handlers::debug_info))
        .route("/agents/_schema", get(handlers::schema_info))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .route("/ping", get(handlers::ping));

    let base_path = server.base_path.trim_end_matches('/');
    let app = if base_path.is_empty() {
        Router::new().merge(public)
    } else {
        Router::new().nest(base_path, public)
    };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET]);
    app.layer(
        ServiceBuilder::new()
            .layer(RequestLoggerLayer)
            .layer(HandleErrorLayer::new(error::handle_middleware_error))
            .layer(TimeoutLayer::new(server.request_timeout()))
            .layer(cors),
    )
    .with_state(state)
}

/// Opens the configured catalog. Also returns the SQLite handle, if any, so
/// the rate limiter can share it.
fn open_catalog(
    storage: &StorageConfig,
    settings: CatalogSettings,
) -> StorageResult<(Catalog, Option<Arc<Mutex<Database>>>)> {
    if let Some(path) = &storage.database {
        let store = Arc::new(SqliteCatalogStore::open(&path.to_string_lossy())?);
        let database = store.database();
        info!(database = %path.display(), "Serving catalog from SQLite");
        return Ok((Catalog::from_store(store, settings), Some(database)));
    }

    let store = match &storage.fixture {
        Some(path) => {
            info!(fixture = %path.display(), "Serving catalog from fixture");
            CatalogFixture::load(path)?.into_memory_store()?
        }
        None => {
            warn!("No storage configured; serving an empty catalog");
            InMemoryCatalogStore::new()
        }
    };
    Ok((Catalog::from_store(Arc::new(store), settings), None))
}

/// Wires storage, catalog and rate limiter from `config`.
///
/// Storage that fails to open does not fail startup: the returned state
/// answers catalog routes with `SERVICE_NOT_READY`.
///
/// # Errors
///
/// Returns an error only for invalid configuration.
pub fn build_state(config: &Config) -> Result<AppState> {
    let (state, database) = match open_catalog(&config.storage, config.catalog_settings()) {
        Ok((catalog, database)) => (AppState::new(Arc::new(catalog), config)?, database),
        Err(e) => {
            error!(error = %e, "Failed to open catalog storage; catalog routes will report SERVICE_NOT_READY");
            (AppState::unavailable(e.to_string(), config)?, None)
        }
    };

    if !config.rate_limit.enabled {
        info!("Rate limiting disabled");
        return Ok(state);
    }

    let store: Arc<dyn RateLimitStore> = match (config.rate_limit.store, database) {
        (RateLimitBackend::Sqlite, Some(database)) => Arc::new(SqliteRateLimitStore::new(database)),
        (RateLimitBackend::Sqlite, None) => {
            warn!("SQLite rate limit store unavailable; counting in memory");
            Arc::new(InMemoryRateLimitStore::new())
        }
        (RateLimitBackend::Memory, _) => Arc::new(InMemoryRateLimitStore::new()),
    };
    let limiter = RateLimiter::new(store, config.rate_limit.max_requests, config.rate_limit.window());
    info!(
        max_requests = limiter.max_requests(),
        window_secs = limiter.window().as_secs(),
        backend = ?config.rate_limit.store,
        trust_forwarded_for = config.rate_limit.trust_forwarded_for,
        "Rate limiting enabled"
    );
    Ok(state.with_rate_limiter(Arc::new(limiter)))
}

/// Serves the catalog until interrupted.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the listener cannot
/// be bound.
pub async fn run(config: &Config) -> Result<()> {
    let state = build_state(config)?;
    let app = router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(config.server.address).await?;
    info!(
        address = %listener.local_addr()?,
        base_path = %config.server.base_path,
        "Catalog server listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Catalog server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
