use mockall::automock;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// these mirror the final_*_data.json files the scraper pipeline writes out. Only the parts the
/// stream api needs are captured, everything else in there is ignored by serde
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub series: Vec<CatalogSeries>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSeries {
    #[serde(default)]
    pub name: String,
    pub jellyfin_name: Option<String>,
    // keyed by "season_<n>"
    #[serde(default)]
    pub seasons: HashMap<String, CatalogSeason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSeason {
    // keyed by "episode_<n>"
    #[serde(default)]
    pub episodes: HashMap<String, CatalogEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEpisode {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub total_streams: u32,
    // language -> streams, kept in file order so "first language with a stream" means the first
    // one the scraper wrote
    #[serde(default)]
    pub streams_by_language: IndexMap<String, Vec<CatalogStream>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogStream {
    #[serde(default)]
    pub stream_url: String,
    #[serde(default)]
    pub provider: String,
}

/// one redirect id and the episode it belongs to, never mutated after the catalog is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeRef {
    pub redirect_id: String,
    pub series_id: usize,
    pub series_name: String,
    pub season_num: u32,
    pub episode_num: u32,
    pub source_site: String,
    pub language: String,
    pub provider: String,
}

impl EpisodeRef {
    pub fn season_key(&self) -> SeasonKey {
        SeasonKey {
            series_id: self.series_id,
            season_num: self.season_num,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeasonKey {
    pub series_id: usize,
    pub season_num: u32,
}

impl std::fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.series_id, self.season_num)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteStats {
    pub series_count: usize,
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    pub total_series: usize,
    pub total_redirects: usize,
    pub providers: BTreeMap<String, usize>,
    pub languages: BTreeMap<String, usize>,
    pub sites: BTreeMap<String, SiteStats>,
}

pub type DynCatalogRepository = Arc<dyn CatalogRepository + Send + Sync>;

/// read-only view over whatever the scrapers produced. Everything here is synchronous, the data
/// is loaded once at startup and never touched again
#[automock]
pub trait CatalogRepository {
    fn find_episode_by_redirect(&self, redirect_id: &str) -> Option<EpisodeRef>;
    fn get_season_episodes(&self, series_id: usize, season_num: u32) -> Vec<EpisodeRef>;
    fn stats(&self) -> CatalogStats;
}
