use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::model::{
    CatalogEpisode, CatalogFile, CatalogRepository, CatalogStats, EpisodeRef, SeasonKey,
    SiteStats,
};

/// one parsed catalog file and the site it came from
#[derive(Debug, Clone)]
pub struct CatalogSource {
    pub site: String,
    pub file_path: String,
    pub catalog: CatalogFile,
}

/// in-memory redirect id -> episode table built from the scraper output
#[derive(Debug, Default)]
pub struct LookupTable {
    redirects: HashMap<String, EpisodeRef>,
    seasons: HashMap<SeasonKey, Vec<EpisodeRef>>,
    stats: CatalogStats,
}

impl LookupTable {
    /// finds every `<site>/data/final_*_data.json` below `data_dir`
    pub fn discover_files(data_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let sites = std::fs::read_dir(data_dir)
            .with_context(|| format!("failed to read data dir {}", data_dir.display()))?;

        for site in sites.flatten() {
            let data = site.path().join("data");
            let Ok(entries) = std::fs::read_dir(&data) else {
                continue;
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let is_catalog = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("final_") && n.ends_with("_data.json"));

                if is_catalog {
                    info!("found site data: {}", path.display());
                    files.push(path);
                }
            }
        }

        files.sort();

        if files.is_empty() {
            anyhow::bail!(
                "no site data files found in {} (expected <site>/data/final_*_data.json)",
                data_dir.display()
            );
        }

        Ok(files)
    }

    pub fn load(files: &[PathBuf], preferred_language: &str) -> anyhow::Result<Self> {
        let mut sources = Vec::with_capacity(files.len());

        for path in files {
            let site = Self::site_name(path);
            info!("loading {} data from {}", site, path.display());

            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let catalog: CatalogFile = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!("  loaded {} series from {}", catalog.series.len(), site);

            sources.push(CatalogSource {
                site,
                file_path: path.display().to_string(),
                catalog,
            });
        }

        let table = Self::from_sources(sources, preferred_language);

        info!(
            "total: {} series with {} redirect urls across {} sites",
            table.stats.total_series,
            table.stats.total_redirects,
            table.stats.sites.len()
        );

        Ok(table)
    }

    pub fn from_sources(sources: Vec<CatalogSource>, preferred_language: &str) -> Self {
        let mut table = Self::default();
        let mut series_id = 0;

        for source in sources {
            table.stats.sites.insert(
                source.site.clone(),
                SiteStats {
                    series_count: source.catalog.series.len(),
                    file_path: source.file_path.clone(),
                },
            );

            for series in source.catalog.series {
                let series_name = series
                    .jellyfin_name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| series.name.clone());

                let mut seasons: Vec<(u32, _)> = series
                    .seasons
                    .iter()
                    .filter_map(|(key, season)| match numbered_key(key, "season_") {
                        Some(num) => Some((num, season)),
                        None => {
                            debug!("skipping season key {} of {}", key, series_name);
                            None
                        }
                    })
                    .collect();
                seasons.sort_by_key(|(num, _)| *num);

                for (season_num, season) in seasons {
                    let mut episodes: Vec<(u32, &CatalogEpisode)> = season
                        .episodes
                        .iter()
                        .filter_map(|(key, episode)| {
                            numbered_key(key, "episode_").map(|num| (num, episode))
                        })
                        .collect();
                    episodes.sort_by_key(|(num, _)| *num);

                    let base = EpisodeRef {
                        redirect_id: String::new(),
                        series_id,
                        series_name: series_name.clone(),
                        season_num,
                        episode_num: 0,
                        source_site: source.site.clone(),
                        language: String::new(),
                        provider: String::new(),
                    };

                    let mut season_refs = Vec::new();

                    for (episode_num, episode) in episodes {
                        for (language, streams) in &episode.streams_by_language {
                            for stream in streams {
                                let Some(redirect_id) = redirect_id(&stream.stream_url) else {
                                    continue;
                                };

                                table.redirects.insert(
                                    redirect_id.to_string(),
                                    EpisodeRef {
                                        redirect_id: redirect_id.to_string(),
                                        episode_num,
                                        language: language.clone(),
                                        provider: stream.provider.clone(),
                                        ..base.clone()
                                    },
                                );
                            }
                        }

                        if episode.total_streams == 0 {
                            continue;
                        }

                        if let Some((language, provider, redirect_id)) =
                            representative_stream(episode, preferred_language)
                        {
                            season_refs.push(EpisodeRef {
                                redirect_id,
                                episode_num,
                                language,
                                provider,
                                ..base.clone()
                            });
                        }
                    }

                    if !season_refs.is_empty() {
                        table.seasons.insert(
                            SeasonKey {
                                series_id,
                                season_num,
                            },
                            season_refs,
                        );
                    }
                }

                series_id += 1;
            }
        }

        table.stats.total_series = series_id;
        table.stats.total_redirects = table.redirects.len();
        for episode in table.redirects.values() {
            *table
                .stats
                .providers
                .entry(episode.provider.clone())
                .or_default() += 1;
            *table
                .stats
                .languages
                .entry(episode.language.clone())
                .or_default() += 1;
        }

        table
    }

    /// sites/<site>/data/final_x_data.json gives <site>, otherwise the x out of the filename
    fn site_name(path: &Path) -> String {
        let parts: Vec<&str> = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();

        if let Some(idx) = parts.iter().position(|p| *p == "sites") {
            // the component after sites/ only counts if it isn't the file itself
            if idx + 2 < parts.len() {
                return parts[idx + 1].to_string();
            }
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match stem
            .strip_prefix("final_")
            .and_then(|s| s.strip_suffix("_data"))
        {
            Some(site) if !site.is_empty() => site.to_string(),
            _ => {
                warn!("could not derive site name from {}", path.display());
                "unknown".to_string()
            }
        }
    }
}

impl CatalogRepository for LookupTable {
    fn find_episode_by_redirect(&self, redirect_id: &str) -> Option<EpisodeRef> {
        self.redirects.get(redirect_id).cloned()
    }

    fn get_season_episodes(&self, series_id: usize, season_num: u32) -> Vec<EpisodeRef> {
        self.seasons
            .get(&SeasonKey {
                series_id,
                season_num,
            })
            .cloned()
            .unwrap_or_default()
    }

    fn stats(&self) -> CatalogStats {
        self.stats.clone()
    }
}

fn numbered_key(key: &str, prefix: &str) -> Option<u32> {
    key.strip_prefix(prefix)?.parse().ok()
}

fn redirect_id(stream_url: &str) -> Option<&str> {
    let (_, id) = stream_url.rsplit_once("/redirect/")?;
    let id = id.trim_end_matches('/');
    (!id.is_empty()).then_some(id)
}

/// the one redirect a season prefetch uses for an episode: first preferred-language stream,
/// otherwise the first language that has a redirect at all
fn representative_stream(
    episode: &CatalogEpisode,
    preferred_language: &str,
) -> Option<(String, String, String)> {
    let preferred = episode
        .streams_by_language
        .get_key_value(preferred_language)
        .into_iter();
    let others = episode
        .streams_by_language
        .iter()
        .filter(|(language, _)| language.as_str() != preferred_language);

    preferred.chain(others).find_map(|(language, streams)| {
        streams.iter().find_map(|stream| {
            redirect_id(&stream.stream_url).map(|id| {
                (
                    language.clone(),
                    stream.provider.clone(),
                    id.to_string(),
                )
            })
        })
    })
}
