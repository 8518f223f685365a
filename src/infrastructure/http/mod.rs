use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::controllers::{conversion::ConversionController, health};
use crate::infrastructure::config::Config;

pub mod request_id;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router
///
/// CORS is wide open in development so a local UI can call the API directly.
pub fn create_router(config: &Config, conversion_controller: Arc<ConversionController>) -> Router {
    let conversion_routes = Router::new()
        .route("/api/tts/convert", post(ConversionController::convert))
        .route("/api/conversions", post(ConversionController::create))
        .route(
            "/api/conversions/:id",
            get(ConversionController::get).delete(ConversionController::cancel),
        )
        .route("/api/conversions/:id/audio", get(ConversionController::audio))
        .route(
            "/api/conversions/:id/segments/:index/audio",
            get(ConversionController::segment_audio),
        )
        .route(
            "/api/conversions/:id/resume",
            post(ConversionController::resume),
        )
        .with_state(conversion_controller);

    let app = Router::new()
        .route("/health", get(health::health))
        .merge(conversion_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    if config.is_development() {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
    } else {
        app
    }
}

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn start_http_server(config: Arc<Config>, app: Router) -> anyhow::Result<()> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
