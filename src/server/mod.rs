pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{
    Router, ServiceExt,
    extract::Request,
    http::{HeaderValue, Method},
    routing::get,
};
use once_cell::sync::Lazy;
use tower::Layer;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use api::{
    diagnostics_controller::DiagnosticsController,
    health_controller::{clear_cache_endpoint, health_endpoint, metrics_endpoint, stats_endpoint},
    stream_controller::StreamController,
};
use error::Error;
use services::AppServices;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub struct ApplicationServer;

impl ApplicationServer {
    /// every route with services attached, no trailing slash handling (that wraps the router
    /// from the outside in `serve`)
    pub fn router(services: AppServices) -> Router {
        let cors = Self::cors_layer(&services.config);

        Router::new()
            .nest("/stream", StreamController::app())
            .merge(DiagnosticsController::app())
            .route("/health", get(health_endpoint))
            .route("/clear-cache", get(clear_cache_endpoint))
            .route("/stats", get(stats_endpoint))
            .route("/metrics", get(metrics_endpoint))
            .fallback(Self::not_found)
            .layer(axum::Extension(services))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(config: Arc<AppConfig>, services: AppServices) -> anyhow::Result<()> {
        Lazy::force(&START_TIME);

        let app = NormalizePathLayer::trim_trailing_slash().layer(Self::router(services));

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        info!("listening on {}", addr);
        info!("stream endpoint: http://{}/stream/redirect/<redirect_id>", addr);

        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .with_graceful_shutdown(Self::shutdown_signal())
        .await
        .context("error while serving")?;

        info!("server stopped");
        Ok(())
    }

    fn cors_layer(config: &AppConfig) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any);

        if config.cors_origin.trim() == "*" {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = config
            .cors_origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid cors origin {}", o);
                    None
                }
            })
            .collect();

        layer.allow_origin(AllowOrigin::list(origins))
    }

    async fn not_found() -> Error {
        Error::NotFound("Endpoint not found".to_string())
    }

    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {}", e);
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
                    warn!("failed to listen for sigterm: {}", e);
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

        info!("shutdown signal received, draining connections...");
    }
}
