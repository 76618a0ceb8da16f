//! Tidepool - A lightweight OStatus microblogging server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Feed endpoints (Atom, hub challenges, signed pushes)     │
//! │  - Update/Subscription endpoints                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Publish, follow/unfollow, signup finalization            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Federation + Data Layer                         │
//! │  - Atom codec, hub notifier, push ingestion                 │
//! │  - SQLite (sqlx), per-feed locks                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for feeds, updates, and subscriptions
//! - `service`: Business logic layer
//! - `federation`: OStatus federation handling
//! - `data`: Database and per-feed lock layer
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool, feed locks, and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Per-feed write serialization
    pub feed_locks: Arc<data::FeedLocks>,

    /// HTTP client for hub traffic
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (schema applied on connect)
    /// 2. Build the hub HTTP client with the configured timeout
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        // The client timeout is the per-hub bound: a hub that exceeds it
        // counts as one failed delivery, nothing more.
        let http_client = reqwest::Client::builder()
            .user_agent("Tidepool/0.1.0")
            .timeout(std::time::Duration::from_secs(
                config.federation.hub_timeout_seconds,
            ))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            feed_locks: Arc::new(data::FeedLocks::new()),
            http_client: Arc::new(http_client),
        })
    }

    /// Hub notifier over the shared HTTP client.
    pub fn notifier(&self) -> federation::HubNotifier {
        federation::HubNotifier::new(
            self.http_client.clone(),
            self.config.federation.max_concurrent_pings,
        )
    }

    /// Inbound push processor.
    pub fn ingestor(&self) -> federation::UpdateIngestor {
        federation::UpdateIngestor::new(self.db.clone(), self.feed_locks.clone())
    }

    /// Account service.
    pub fn account_service(&self) -> service::AccountService {
        service::AccountService::new(
            self.db.clone(),
            self.config.server.base_url(),
            self.config.federation.hubs.clone(),
        )
    }

    /// Update service.
    pub fn update_service(&self) -> service::UpdateService {
        service::UpdateService::new(
            self.db.clone(),
            self.feed_locks.clone(),
            self.notifier(),
            self.config.server.base_url(),
        )
    }

    /// Follow service.
    pub fn follow_service(&self) -> service::FollowService {
        service::FollowService::new(self.db.clone(), self.notifier(), self.config.server.base_url())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::feeds_router())
        .merge(api::updates_router())
        .merge(api::subscriptions_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
