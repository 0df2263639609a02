// the heart of the whole thing: redirect id -> provider page -> master m3u8, cached, and once one
// episode resolves cold the rest of its season gets warmed in the background
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{extractor_services::DynStreamExtractor, redirect_services::DynRedirectResolver};
use crate::{
    config::AppConfig,
    database::{
        CacheEntry, DynCatalogRepository, EpisodeRef, ProviderType, ResolutionCache, SeasonLocks,
    },
    server::error::{AppResult, Error},
};

pub type PrefetchHandle = JoinHandle<()>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamResolution {
    /// fresh cache hit, nothing went over the network
    Cached(CacheEntry),
    /// resolved just now and stored
    Resolved(CacheEntry),
    /// the chain led somewhere but no media url could be pulled out of the page
    ProviderOnly {
        provider_url: String,
        provider: ProviderType,
    },
}

impl StreamResolution {
    pub fn media_url(&self) -> Option<&str> {
        match self {
            Self::Cached(entry) | Self::Resolved(entry) => Some(&entry.stream_url),
            Self::ProviderOnly { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct Resolution {
    pub stream: StreamResolution,
    /// the season prefetch this request kicked off, if it was the one to start it. Request
    /// handlers just drop this, the task keeps running on its own
    pub prefetch: Option<PrefetchHandle>,
}

/// result of a cache-bypassing dry run, the /test route reports it as is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub redirect_url: String,
    pub provider_url: String,
    pub provider: ProviderType,
    pub stream_url: Option<String>,
}

#[derive(Clone)]
pub struct ResolutionService {
    catalog: DynCatalogRepository,
    resolver: DynRedirectResolver,
    extractor: DynStreamExtractor,
    cache: Arc<ResolutionCache>,
    season_locks: SeasonLocks,
    prefetch_permits: Arc<Semaphore>,
    config: Arc<AppConfig>,
}

impl ResolutionService {
    pub fn new(
        catalog: DynCatalogRepository,
        resolver: DynRedirectResolver,
        extractor: DynStreamExtractor,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            extractor,
            cache: Arc::new(ResolutionCache::new()),
            season_locks: SeasonLocks::new(),
            prefetch_permits: Arc::new(Semaphore::new(config.max_concurrent_prefetches.max(1))),
            config,
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn season_locks(&self) -> &SeasonLocks {
        &self.season_locks
    }

    pub fn redirect_url_for(&self, redirect_id: &str, episode: Option<&EpisodeRef>) -> String {
        let site = episode
            .map(|e| e.source_site.as_str())
            .unwrap_or(&self.config.default_source_site);
        self.config.redirect_url(site, redirect_id)
    }

    /// cache first, then the full redirect -> extraction pipeline. A fresh success is cached and
    /// starts warming the rest of the season
    pub async fn resolve_stream(&self, redirect_id: &str) -> AppResult<Resolution> {
        if let Some(entry) = self.cache.get(redirect_id) {
            metrics::counter!("stream_cache_hits_total").increment(1);
            info!("cache hit for redirect {} ({})", redirect_id, entry.provider);
            return Ok(Resolution {
                stream: StreamResolution::Cached(entry),
                prefetch: None,
            });
        }

        metrics::counter!("stream_cache_misses_total").increment(1);
        info!("no cache found for {}, resolving fresh", redirect_id);

        let episode = self
            .catalog
            .find_episode_by_redirect(redirect_id)
            .ok_or_else(|| {
                warn!("redirect id {} not found in data", redirect_id);
                Error::NotFound(format!("Redirect ID {} not found", redirect_id))
            })?;

        info!(
            "resolving {} ({}) for {} S{}E{}",
            redirect_id,
            episode.source_site,
            episode.series_name,
            episode.season_num,
            episode.episode_num
        );

        let (provider_url, provider) = self.resolve_provider(&episode).await?;

        let Some(stream_url) = self.extractor.extract_media_url(&provider_url).await else {
            metrics::counter!("stream_resolution_failures_total", "stage" => "extraction")
                .increment(1);
            warn!("extraction failed for {}, only have the provider url", redirect_id);
            return Ok(Resolution {
                stream: StreamResolution::ProviderOnly {
                    provider_url,
                    provider,
                },
                prefetch: None,
            });
        };

        let entry = self.store(redirect_id, &stream_url, provider);
        let prefetch = self.start_season_prefetch(&episode);

        Ok(Resolution {
            stream: StreamResolution::Resolved(entry),
            prefetch,
        })
    }

    /// same pipeline as `resolve_stream` but never reads or writes the cache
    pub async fn probe(&self, redirect_id: &str) -> AppResult<ProbeOutcome> {
        let episode = self.catalog.find_episode_by_redirect(redirect_id);
        let redirect_url = self.redirect_url_for(redirect_id, episode.as_ref());

        let provider_url = self.resolver.resolve(&redirect_url).await?;
        let provider = ProviderType::from_url(&provider_url);
        let stream_url = self.extractor.extract_media_url(&provider_url).await;

        Ok(ProbeOutcome {
            redirect_url,
            provider_url,
            provider,
            stream_url,
        })
    }

    async fn resolve_provider(&self, episode: &EpisodeRef) -> AppResult<(String, ProviderType)> {
        let redirect_url = self.redirect_url_for(&episode.redirect_id, Some(episode));

        let provider_url = self.resolver.resolve(&redirect_url).await.map_err(|e| {
            metrics::counter!("stream_resolution_failures_total", "stage" => "redirect")
                .increment(1);
            error!("failed to resolve redirect {}: {}", episode.redirect_id, e);
            match e {
                Error::RedirectResolution(_) => e,
                other => Error::RedirectResolution(other.to_string()),
            }
        })?;

        let provider = ProviderType::from_url(&provider_url);
        info!("provider detected: {} - url: {}", provider, provider_url);

        Ok((provider_url, provider))
    }

    fn store(&self, redirect_id: &str, stream_url: &str, provider: ProviderType) -> CacheEntry {
        self.cache
            .put(redirect_id, stream_url, provider, self.config.cache_ttl())
    }

    /// spawns the warming task for `episode`'s season unless one is already running. The season
    /// lock is owned by the task and released however the task ends
    pub fn start_season_prefetch(&self, episode: &EpisodeRef) -> Option<PrefetchHandle> {
        let key = episode.season_key();

        let Some(guard) = self.season_locks.try_acquire(key) else {
            info!(
                "season {} of {} already being cached, skipping duplicate",
                episode.season_num, episode.series_name
            );
            return None;
        };

        metrics::counter!("season_prefetch_started_total").increment(1);

        let service = self.clone();
        let skip_redirect_id = episode.redirect_id.clone();

        Some(tokio::spawn(async move {
            // moved in here so the drop runs on every way out of the task, panics included
            let _guard = guard;

            let siblings = service
                .catalog
                .get_season_episodes(key.series_id, key.season_num);
            info!(
                "starting background caching for {} episodes in season {}",
                siblings.len(),
                key
            );

            service.prefetch_episodes(siblings, &skip_redirect_id).await;
        }))
    }

    async fn prefetch_episodes(&self, episodes: Vec<EpisodeRef>, skip_redirect_id: &str) {
        let _permit = match self.prefetch_permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("prefetch semaphore closed: {}", e);
                return;
            }
        };

        let mut cached = 0usize;

        for episode in episodes {
            if episode.redirect_id == skip_redirect_id {
                continue;
            }
            if self.cache.contains_fresh(&episode.redirect_id) {
                debug!("{} already cached, skipping", episode.redirect_id);
                continue;
            }

            // pacing toward the provider, going faster gets the box blocked
            tokio::time::sleep(self.config.prefetch_delay()).await;

            info!("background caching: {}", episode.redirect_id);

            match self.prefetch_one(&episode).await {
                Ok(()) => {
                    cached += 1;
                    metrics::counter!("season_prefetch_episodes_total", "outcome" => "cached")
                        .increment(1);
                    info!("background cached: {}", episode.redirect_id);
                }
                Err(e) => {
                    metrics::counter!("season_prefetch_episodes_total", "outcome" => "failed")
                        .increment(1);
                    error!("background caching error for {}: {}", episode.redirect_id, e);
                }
            }
        }

        info!("background season caching completed, {} new entries", cached);
    }

    async fn prefetch_one(&self, episode: &EpisodeRef) -> AppResult<()> {
        let (provider_url, provider) = self.resolve_provider(episode).await?;

        let stream_url = self
            .extractor
            .extract_media_url(&provider_url)
            .await
            .ok_or_else(|| Error::Extraction(format!("nothing found on {}", provider_url)))?;

        self.store(&episode.redirect_id, &stream_url, provider);
        Ok(())
    }
}
