use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::model::{CacheEntry, ProviderType};

/// redirect id -> resolved media url, shared by request handlers and prefetch tasks.
///
/// Expiry is lazy: `get` never hands out an expired entry, but the entry itself only goes away
/// on `sweep_expired` (the health route calls it) or `clear`.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // a panicking prefetch task must not take the cache down with it
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, redirect_id: &str) -> Option<CacheEntry> {
        let now = Utc::now();
        self.lock()
            .get(redirect_id)
            .filter(|entry| entry.is_valid_at(now))
            .cloned()
    }

    pub fn contains_fresh(&self, redirect_id: &str) -> bool {
        self.get(redirect_id).is_some()
    }

    /// stores a fresh entry expiring `ttl` from now and hands a copy back
    pub fn put(
        &self,
        redirect_id: &str,
        stream_url: &str,
        provider: ProviderType,
        ttl: Duration,
    ) -> CacheEntry {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);

        let entry = CacheEntry {
            stream_url: stream_url.to_string(),
            provider,
            expires_at,
        };
        self.insert(redirect_id, entry.clone());

        info!(
            "cached {} ({}) for {}s",
            redirect_id,
            provider,
            ttl.num_seconds()
        );
        entry
    }

    /// stores a prebuilt entry, overwriting whatever was there
    pub fn insert(&self, redirect_id: &str, entry: CacheEntry) {
        self.lock().insert(redirect_id.to_string(), entry);
    }

    /// drops everything and reports how many entries were there
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("swept {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn counts_by_provider(&self) -> BTreeMap<ProviderType, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.lock().values() {
            *counts.entry(entry.provider).or_default() += 1;
        }
        counts
    }
}
