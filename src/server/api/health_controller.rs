use axum::Extension;
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::info;

use crate::database::CatalogStats;
use crate::server::dtos::health_dto::{ClearCacheResponse, HealthResponse, HealthStatus};
use crate::server::error::{AppResult, Error};
use crate::server::services::AppServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health check, also the only place expired entries get swept
pub async fn health_endpoint(Extension(services): Extension<AppServices>) -> Json<HealthResponse> {
    let cache = services.resolution.cache();

    let cleaned = cache.sweep_expired();
    if cleaned > 0 {
        info!("cleaned {} expired cache entries", cleaned);
    }

    let cache_by_provider = cache
        .counts_by_provider()
        .into_iter()
        .map(|(provider, count)| (provider.to_string(), count))
        .collect();

    let stats = services.catalog.stats();

    Json(HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: format!("{:?}", services.config.cargo_env).to_lowercase(),
        cache_size: cache.len(),
        cache_by_provider,
        cache_cleaned: cleaned,
        cache_ttl_seconds: services.config.cache_ttl_seconds,
        series_count: stats.total_series,
        redirect_count: stats.total_redirects,
        prefetching_seasons: services.resolution.season_locks().len(),
    })
}

/// drops every resolved url, the catalog stays as it is
pub async fn clear_cache_endpoint(
    Extension(services): Extension<AppServices>,
) -> Json<ClearCacheResponse> {
    let cleared = services.resolution.cache().clear();
    info!("cleared {} cache entries", cleared);

    Json(ClearCacheResponse {
        message: format!("Cleared {} cache entries", cleared),
        cleared,
    })
}

pub async fn stats_endpoint(Extension(services): Extension<AppServices>) -> Json<CatalogStats> {
    Json(services.catalog.stats())
}

pub async fn metrics_endpoint(Extension(services): Extension<AppServices>) -> AppResult<Response> {
    let handle = services
        .metrics
        .as_ref()
        .ok_or_else(|| Error::NotFound("Metrics are not enabled".to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
