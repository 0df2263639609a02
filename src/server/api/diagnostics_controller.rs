// debugging routes, nothing in jellyfin calls these
use axum::{
    Json, Router,
    extract::Path,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{info, warn};

use crate::server::{
    dtos::stream_dto::{
        CachedStreamInfo, ExtractionMethod, InfoResponse, TestFailureResponse,
        TestResolutionResponse,
    },
    error::{AppResult, Error},
    extractors::ClientContext,
};

pub struct DiagnosticsController;

impl DiagnosticsController {
    pub fn app() -> Router {
        Router::new()
            .route("/info/{redirect_id}", get(Self::redirect_info))
            .route("/test/{redirect_id}", get(Self::test_redirect))
    }

    async fn redirect_info(
        ClientContext(_, services): ClientContext,
        Path(redirect_id): Path<String>,
    ) -> AppResult<Json<InfoResponse>> {
        let episode = services
            .catalog
            .find_episode_by_redirect(&redirect_id)
            .ok_or_else(|| Error::NotFound("Redirect ID not found".to_string()))?;

        let cached = services
            .resolution
            .cache()
            .get(&redirect_id)
            .map(|entry| CachedStreamInfo {
                expires_in: entry.expires_in_seconds(),
                stream_url: entry.stream_url,
                provider: entry.provider,
            });

        Ok(Json(InfoResponse { episode, cached }))
    }

    /// full resolution without the cache on either side
    async fn test_redirect(
        ClientContext(client_id, services): ClientContext,
        Path(redirect_id): Path<String>,
    ) -> Response {
        info!("testing redirect resolution for {} ({})", redirect_id, client_id);

        let outcome = match services.resolution.probe(&redirect_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("test resolution of {} failed: {}", redirect_id, e);
                return Json(TestFailureResponse {
                    error: "Failed to resolve redirect".to_string(),
                    step: "redirect_resolution",
                })
                .into_response();
            }
        };

        let (stream_url, extraction_method) = match outcome.stream_url {
            Some(url) => (url, ExtractionMethod::Deobfuscation),
            None => (outcome.provider_url.clone(), ExtractionMethod::DirectFallback),
        };

        Json(TestResolutionResponse {
            redirect_id,
            redirect_url: outcome.redirect_url,
            provider_url: outcome.provider_url,
            provider_type: outcome.provider,
            stream_url,
            extraction_method,
        })
        .into_response()
    }
}
