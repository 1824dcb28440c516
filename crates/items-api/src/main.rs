// Items API server
// Decision: Postgres when DATABASE_URL is set, in-memory store otherwise
// Decision: The batch processor owns the worker pool; the server builds exactly one

mod common;
mod config;
mod items;
mod services;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{extract::State, routing::get, Json, Router};
use common::ErrorResponse;
use config::ApiConfig;
use items_core::{
    BatchProcessor, FieldViolation, InMemoryItemStore, Item, ItemInput, ItemStore,
    ProcessorConfig,
};
use items_storage::Database;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store,
    })
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    store: &'static str,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::process_items,
    ),
    components(
        schemas(Item, ItemInput, FieldViolation, ErrorResponse)
    ),
    tags(
        (name = "items", description = "Item management and batch processing endpoints")
    ),
    info(
        title = "Items API",
        version = "0.1.0",
        description = "API for managing items and marking them as processed",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "items_api=debug,items_core=debug,items_storage=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("items-api starting...");

    let config = ApiConfig::from_env();

    // Initialize store
    let store: Arc<dyn ItemStore> = match &config.database_url {
        Some(database_url) => {
            let db = Database::from_url(database_url)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Connected to database");
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, items are kept in memory and lost on restart");
            Arc::new(InMemoryItemStore::new())
        }
    };

    // Load processor configuration from environment
    let processor_config = ProcessorConfig::from_env();
    tracing::info!(
        workers = processor_config.workers,
        item_delay_ms = processor_config.item_delay.as_millis() as u64,
        "Batch processor configured"
    );
    let processor = Arc::new(BatchProcessor::from_config(store.clone(), &processor_config));

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let items_state = items::AppState::new(store, processor.clone());
    let health_state = HealthState {
        store: config.store_backend(),
    };
    let app = build_app(items_state, health_state, &config);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Batches still waiting for a slot are reported as failed
    processor.pool().close();
    tracing::info!(total_processed = processor.processed_total(), "items-api stopped");

    Ok(())
}

/// Assemble the full application router
fn build_app(
    items_state: items::AppState,
    health_state: HealthState,
    config: &ApiConfig,
) -> Router {
    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(build_router_with_prefix(
            items::routes(items_state),
            &config.api_prefix,
        ))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let cors_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let app = if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
        app
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C signal, shutting down gracefully"),
            Err(e) => tracing::warn!("Failed to install Ctrl+C handler: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received terminate signal, shutting down gracefully");
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
