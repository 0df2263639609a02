use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use streaming_api::{CacheEntry, ProviderType, ResolutionCache};

fn entry(url: &str, provider: ProviderType, expires_in: ChronoDuration) -> CacheEntry {
    CacheEntry {
        stream_url: url.to_string(),
        provider,
        expires_at: Utc::now() + expires_in,
    }
}

#[test]
fn test_expired_entry_is_never_returned() {
    let cache = ResolutionCache::new();
    cache.insert(
        "100",
        entry(
            "https://cdn.example.net/a/master.m3u8",
            ProviderType::Voe,
            ChronoDuration::seconds(-1),
        ),
    );

    assert_eq!(cache.get("100"), None);
    assert!(!cache.contains_fresh("100"));
    // still there until something sweeps it
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_entry_within_ttl_is_returned() {
    let cache = ResolutionCache::new();
    let stored = entry(
        "https://cdn.example.net/b/master.m3u8",
        ProviderType::Voe,
        ChronoDuration::seconds(3600),
    );
    cache.insert("200", stored.clone());

    assert_eq!(cache.get("200"), Some(stored));
}

#[test]
fn test_put_uses_the_ttl() {
    let cache = ResolutionCache::new();
    cache.put(
        "300",
        "https://cdn.example.net/c/master.m3u8",
        ProviderType::Vidoza,
        Duration::from_secs(3600),
    );

    let cached = cache.get("300").unwrap();
    assert_eq!(cached.provider, ProviderType::Vidoza);
    let remaining = cached.expires_in_seconds();
    assert!((3590..=3600).contains(&remaining), "remaining was {remaining}");
}

#[test]
fn test_later_put_overwrites() {
    let cache = ResolutionCache::new();
    cache.put("1", "https://old.example/master.m3u8", ProviderType::Voe, Duration::from_secs(60));
    cache.put("1", "https://new.example/master.m3u8", ProviderType::Voe, Duration::from_secs(60));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("1").unwrap().stream_url, "https://new.example/master.m3u8");
}

#[test]
fn test_clear_reports_prior_count() {
    let cache = ResolutionCache::new();
    for id in ["1", "2", "3"] {
        cache.put(id, "https://cdn.example.net/master.m3u8", ProviderType::Voe, Duration::from_secs(60));
    }
    cache.insert(
        "4",
        entry("https://cdn.example.net/x", ProviderType::Unknown, ChronoDuration::seconds(-10)),
    );

    assert_eq!(cache.clear(), 4);
    assert!(cache.is_empty());
    assert_eq!(cache.clear(), 0);
}

#[test]
fn test_sweep_removes_only_expired() {
    let cache = ResolutionCache::new();
    cache.insert("old", entry("https://a", ProviderType::Voe, ChronoDuration::seconds(-5)));
    cache.insert("older", entry("https://b", ProviderType::Doodstream, ChronoDuration::hours(-2)));
    cache.insert("fresh", entry("https://c", ProviderType::Voe, ChronoDuration::seconds(600)));

    assert_eq!(cache.sweep_expired(), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains_fresh("fresh"));
    assert_eq!(cache.sweep_expired(), 0);
}

#[test]
fn test_counts_by_provider() {
    let cache = ResolutionCache::new();
    cache.put("1", "https://a", ProviderType::Voe, Duration::from_secs(60));
    cache.put("2", "https://b", ProviderType::Voe, Duration::from_secs(60));
    cache.put("3", "https://c", ProviderType::Vidoza, Duration::from_secs(60));

    let counts = cache.counts_by_provider();
    assert_eq!(counts.get(&ProviderType::Voe), Some(&2));
    assert_eq!(counts.get(&ProviderType::Vidoza), Some(&1));
    assert_eq!(counts.get(&ProviderType::Doodstream), None);
}

#[test]
fn test_writes_from_a_panicking_thread_are_kept() {
    let cache = Arc::new(ResolutionCache::new());
    cache.put("1", "https://a", ProviderType::Voe, Duration::from_secs(60));

    let poisoned = cache.clone();
    let result = std::thread::spawn(move || {
        poisoned.put("2", "https://b", ProviderType::Voe, Duration::from_secs(60));
        panic!("prefetch blew up");
    })
    .join();

    assert!(result.is_err());
    assert_eq!(cache.len(), 2);
    assert!(cache.contains_fresh("1"));
}
