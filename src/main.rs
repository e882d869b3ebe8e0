//! Church Roster Backend
//!
//! REST backend for church membership rosters with SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{AccountRepository, SqliteRosterStore};
use store::MemberRepository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub members: Arc<MemberRepository>,
    pub accounts: Arc<AccountRepository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Church Roster Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (ROSTER_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let members = Arc::new(MemberRepository::new(Arc::new(SqliteRosterStore::new(
        pool.clone(),
    ))));
    let accounts = Arc::new(AccountRepository::new(pool));

    // Create application state
    let state = AppState {
        members,
        accounts,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Rosters
        .route(
            "/rosters/{church}/{department}/{position}",
            get(api::get_roster),
        )
        .route(
            "/rosters/{church}/{department}/{position}/members",
            get(api::list_members)
                .post(api::create_members)
                .delete(api::remove_members),
        )
        .route(
            "/rosters/{church}/{department}/{position}/members/visible",
            get(api::list_visible_members),
        )
        .route(
            "/rosters/{church}/{department}/{position}/members/{id}",
            patch(api::modify_member),
        )
        // Accounts
        .route(
            "/accounts/{uid}",
            get(api::get_account).put(api::put_account),
        )
        .route("/session", get(api::get_session))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
