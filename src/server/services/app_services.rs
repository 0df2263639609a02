use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use crate::{config::AppConfig, database::DynCatalogRepository};

use super::{
    extractor_services::{DynStreamExtractor, VoeExtractorService},
    http_services::{DynHttpFetcher, ReqwestFetcher},
    playlist_services::PlaylistService,
    redirect_services::{DynRedirectResolver, RedirectResolverService},
    resolution_services::ResolutionService,
};

/// everything the routes need, cloned into every request through an `Extension`
#[derive(Clone)]
pub struct AppServices {
    pub resolution: ResolutionService,
    pub playlist: PlaylistService,
    pub catalog: DynCatalogRepository,
    pub metrics: Option<PrometheusHandle>,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(catalog: DynCatalogRepository, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let http = Arc::new(ReqwestFetcher::new(&config)?) as DynHttpFetcher;
        Ok(Self::with_fetcher(catalog, http, config))
    }

    /// wires the real resolver and extractor on top of `http`, tests hand in a mock here
    pub fn with_fetcher(
        catalog: DynCatalogRepository,
        http: DynHttpFetcher,
        config: Arc<AppConfig>,
    ) -> Self {
        info!("starting services...");

        let resolver = Arc::new(RedirectResolverService::new(
            http.clone(),
            config.max_redirect_hops,
            config.hop_limit_policy,
        )) as DynRedirectResolver;
        let extractor = Arc::new(VoeExtractorService::new(http.clone())) as DynStreamExtractor;

        Self::from_parts(catalog, resolver, extractor, http, config)
    }

    pub fn from_parts(
        catalog: DynCatalogRepository,
        resolver: DynRedirectResolver,
        extractor: DynStreamExtractor,
        http: DynHttpFetcher,
        config: Arc<AppConfig>,
    ) -> Self {
        let resolution =
            ResolutionService::new(catalog.clone(), resolver, extractor, config.clone());
        let playlist = PlaylistService::new(http);

        Self {
            resolution,
            playlist,
            catalog,
            metrics: None,
            config,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
