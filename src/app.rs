//! Router assembly and server startup.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, patch},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{AppConfig, Environment};
use crate::database::{PgStore, Store};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, request_id_middleware};
use crate::services::{CertificateService, ProgressService};

/// Shared handler state. Cloned per request, so everything behind it is an Arc.
#[derive(Clone)]
pub struct AppState {
    pub progress: ProgressService,
    pub certificates: CertificateService,
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            progress: ProgressService::new(store.clone()),
            certificates: CertificateService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .nest("/api/v1", api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(middleware::from_fn(request_id_middleware));

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(language_routes())
        .merge(certificate_routes())
        // route_layer so unknown paths still answer 404 instead of 401
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn language_routes() -> Router<AppState> {
    use protected::progress::{language, lesson, section, series};

    Router::new()
        .route("/languages/progress", get(language::list))
        .route(
            "/languages/:language/progress",
            get(language::get)
                .post(language::post)
                .delete(language::delete),
        )
        .route(
            "/languages/:language/series/:series/progress",
            get(series::get).post(series::post).delete(series::delete),
        )
        .route(
            "/languages/:language/series/:series/sections/:section/progress",
            get(section::get).post(section::post).delete(section::delete),
        )
        .route(
            "/languages/:language/series/:series/sections/:section/lessons/:lesson/progress",
            get(lesson::get).post(lesson::post).delete(lesson::delete),
        )
        .route(
            "/languages/:language/series/:series/sections/:section/lessons/:lesson/progress/complete",
            patch(lesson::complete),
        )
}

fn certificate_routes() -> Router<AppState> {
    use protected::certificates;

    Router::new()
        .route("/certificates", get(certificates::list))
        .route("/certificates/:id", get(certificates::show))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}

/// Connect to Postgres, apply migrations when configured, and serve until ctrl-c.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        store.migrate().await.context("failed to run migrations")?;
    }

    let result = serve_with(Arc::new(store.clone()), config).await;
    store.close().await;
    result
}

/// Serve with an already constructed store (the CLI uses this for `--memory`).
pub async fn serve_with(store: Arc<dyn Store>, config: AppConfig) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    info!(environment = ?config.environment, "Starting Kiwi Progress API");

    let app = router(AppState::new(store, config));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
