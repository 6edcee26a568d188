use axum::Router;
use axum::http::{Method, StatusCode, Uri, header};
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config;
use crate::task::PostgresTaskRepository;
use crate::task::api::{TaskState, create_task_router};

/// Builds the full application router: task routes, health check, plain-text
/// 404 fallback, request tracing and permissive CORS on every response.
pub fn create_router(task_state: TaskState) -> Router {
    Router::new()
        .merge(create_task_router(task_state))
        .route("/health", axum::routing::get(health_check_handler))
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
                ),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.connection_target).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let task_state = TaskState {
        repository: Arc::new(PostgresTaskRepository::new(db)),
    };
    let app = create_router(task_state);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[tracing::instrument]
pub async fn not_found_handler(uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("404 - Path {} not found", uri.path()),
    )
}
