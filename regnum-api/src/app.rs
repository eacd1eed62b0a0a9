/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use regnum_api::{app::{build_router, AppState}, config::Config};
/// use regnum_shared::db::{gateway::PgGateway, pool::create_pool};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(&config.database).await?;
/// let state = AppState::new(Arc::new(PgGateway::new(pool)), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use regnum_shared::auth::{jwt::TokenCodec, middleware::create_jwt_middleware};
use regnum_shared::db::gateway::DataGateway;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Data-access gateway over the connection pool
    pub db: Arc<dyn DataGateway>,

    /// Session token codec built from the configured secret
    pub tokens: Arc<TokenCodec>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: Arc<dyn DataGateway>, config: Config) -> Self {
        Self {
            db,
            tokens: Arc::new(config.token_codec()),
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health                # Health check (public)
/// └── /api/
///     ├── POST /auth/register     # public
///     ├── POST /auth/login        # public
///     ├── GET  /auth/me           # bearer token
///     ├── GET  /inventory         # bearer token
///     └── POST /inventory         # bearer token
/// ```
///
/// Middleware, outermost first: CORS, request tracing, then bearer
/// authentication on the protected routes only.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/inventory",
            get(routes::inventory::list_inventory).post(routes::inventory::create_inventory_item),
        )
        .route_layer(axum::middleware::from_fn(create_jwt_middleware(
            state.tokens.clone(),
        )));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
