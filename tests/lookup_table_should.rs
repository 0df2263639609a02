use std::fs;
use std::path::Path;

use serde_json::json;
use streaming_api::{CatalogRepository, LookupTable};
use tempfile::TempDir;

fn write_catalog(root: &Path, site: &str, catalog: serde_json::Value) {
    let data = root.join("sites").join(site).join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join(format!("final_{}_data.json", site)),
        serde_json::to_string_pretty(&catalog).unwrap(),
    )
    .unwrap();
}

fn stream(site: &str, id: u32, provider: &str) -> serde_json::Value {
    json!({ "stream_url": format!("https://{}.to/redirect/{}", site, id), "provider": provider })
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();

    write_catalog(
        dir.path(),
        "serienstream",
        json!({
            "series": [{
                "name": "test-show",
                "jellyfin_name": "Test Show",
                "seasons": {
                    "season_1": {
                        "episodes": {
                            "episode_2": {
                                "url": "https://serienstream.to/serie/stream/test-show/staffel-1/episode-2",
                                "total_streams": 2,
                                "streams_by_language": {
                                    "Englisch": [stream("serienstream", 102, "VOE")],
                                    "Deutsch": [stream("serienstream", 202, "VOE")]
                                }
                            },
                            "episode_1": {
                                "url": "https://serienstream.to/serie/stream/test-show/staffel-1/episode-1",
                                "total_streams": 1,
                                "streams_by_language": {
                                    "Englisch": [stream("serienstream", 101, "Doodstream")]
                                }
                            },
                            "episode_3": {
                                "url": "https://serienstream.to/serie/stream/test-show/staffel-1/episode-3",
                                "total_streams": 0,
                                "streams_by_language": {}
                            }
                        }
                    },
                    "specials": { "episodes": {} }
                }
            }]
        }),
    );

    write_catalog(
        dir.path(),
        "aniworld",
        json!({
            "series": [{
                "name": "anime-show",
                "seasons": {
                    "season_2": {
                        "episodes": {
                            "episode_1": {
                                "url": "https://aniworld.to/anime/stream/anime-show/staffel-2/episode-1",
                                "total_streams": 1,
                                "streams_by_language": {
                                    "Deutsch": [stream("aniworld", 900, "VOE")]
                                }
                            }
                        }
                    }
                }
            }]
        }),
    );

    dir
}

fn load(dir: &TempDir) -> LookupTable {
    let files = LookupTable::discover_files(&dir.path().join("sites")).unwrap();
    LookupTable::load(&files, "Deutsch").unwrap()
}

#[test]
fn test_discovers_every_site_file() {
    let dir = fixture();
    let files = LookupTable::discover_files(&dir.path().join("sites")).unwrap();

    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.to_string_lossy().ends_with("_data.json")));
}

#[test]
fn test_empty_data_dir_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(LookupTable::discover_files(dir.path()).is_err());
}

#[test]
fn test_every_redirect_id_is_indexed() {
    let dir = fixture();
    let table = load(&dir);

    let episode = table.find_episode_by_redirect("102").unwrap();
    assert_eq!(episode.series_name, "Test Show");
    assert_eq!(episode.source_site, "serienstream");
    assert_eq!(episode.season_num, 1);
    assert_eq!(episode.episode_num, 2);
    assert_eq!(episode.language, "Englisch");

    let anime = table.find_episode_by_redirect("900").unwrap();
    assert_eq!(anime.source_site, "aniworld");
    // no jellyfin_name, falls back to the scraped name
    assert_eq!(anime.series_name, "anime-show");
    assert_ne!(anime.series_id, episode.series_id);

    assert!(table.find_episode_by_redirect("404").is_none());
}

#[test]
fn test_season_prefers_the_configured_language() {
    let dir = fixture();
    let table = load(&dir);
    let series_id = table.find_episode_by_redirect("101").unwrap().series_id;

    let season = table.get_season_episodes(series_id, 1);

    let ids: Vec<&str> = season.iter().map(|e| e.redirect_id.as_str()).collect();
    // sorted by episode, episode 3 has no streams at all
    assert_eq!(ids, vec!["101", "202"]);
    assert_eq!(season[1].language, "Deutsch");
    assert!(table.get_season_episodes(series_id, 9).is_empty());
}

#[test]
fn test_missing_preferred_language_falls_back_to_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final_serienstream_data.json");
    // written by hand, "Japanisch" sorts after "Englisch" but comes first in the file
    fs::write(
        &path,
        r#"{
            "series": [{
                "name": "ordered-show",
                "seasons": {
                    "season_1": {
                        "episodes": {
                            "episode_1": {
                                "streams_by_language": {
                                    "Japanisch": [{ "stream_url": "https://serienstream.to/redirect/31", "provider": "VOE" }],
                                    "Englisch": [{ "stream_url": "https://serienstream.to/redirect/32", "provider": "VOE" }]
                                }
                            }
                        }
                    }
                }
            }]
        }"#,
    )
    .unwrap();

    let table = LookupTable::load(&[path], "Deutsch").unwrap();
    let series_id = table.find_episode_by_redirect("31").unwrap().series_id;
    let season = table.get_season_episodes(series_id, 1);

    assert_eq!(season.len(), 1);
    assert_eq!(season[0].redirect_id, "31");
    assert_eq!(season[0].language, "Japanisch");
}

#[test]
fn test_stats_cover_all_sites() {
    let dir = fixture();
    let stats = load(&dir).stats();

    assert_eq!(stats.total_series, 2);
    assert_eq!(stats.total_redirects, 4);
    assert_eq!(stats.providers.get("VOE"), Some(&3));
    assert_eq!(stats.providers.get("Doodstream"), Some(&1));
    assert_eq!(stats.languages.get("Deutsch"), Some(&2));
    assert_eq!(stats.sites.len(), 2);
    assert_eq!(stats.sites["aniworld"].series_count, 1);
}

#[test]
fn test_broken_json_fails_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final_broken_data.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(LookupTable::load(&[path], "Deutsch").is_err());
}
