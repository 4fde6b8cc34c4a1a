//! Takosu - an anime catalog and help-desk chat server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Catalog: index, search, anime/episode pages              │
//! │  - Long-poll feeds: episode comments, help chat             │
//! │  - Accounts, suggestions, metrics                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Cursor poll loop (shared by both feeds)                  │
//! │  - Feed projection (localized dates, viewer flags)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: poll engine and feed projection
//! - `data`: database and models
//! - `auth`: session tokens and password hashing
//! - `config`: configuration management
//! - `metrics`: Prometheus instruments
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Ensure the configured staff account exists
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;

        Self::ensure_staff_user(&db, &config).await?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
        })
    }

    /// Ensure the configured staff account exists
    ///
    /// The help chat needs a staff side; without one, user conversations
    /// would never get an answer.
    async fn ensure_staff_user(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<(), error::AppError> {
        let Some(password) = config.admin.password.as_deref() else {
            tracing::debug!("No admin password configured; skipping staff bootstrap");
            return Ok(());
        };

        if db
            .get_user_by_username(&config.admin.username)
            .await?
            .is_some()
        {
            tracing::info!(username = %config.admin.username, "Staff account exists");
            return Ok(());
        }

        let user = data::User {
            id: data::EntityId::new().0,
            username: config.admin.username.clone(),
            password_hash: auth::password::hash_password(password)?,
            icon: None,
            is_superuser: true,
            created_at: chrono::Utc::now(),
        };
        db.insert_user(&user).await?;

        tracing::info!(username = %user.username, "Staff account created");

        Ok(())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments. The catalog router goes
/// last: its `/:anime_title` routes are the dynamic tail under every
/// static route.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::accounts_router())
        .merge(api::suggestions_router())
        .merge(api::chat_router())
        .merge(api::catalog_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
