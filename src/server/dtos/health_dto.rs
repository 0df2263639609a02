use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub version: String,
    pub environment: String,
    pub cache_size: usize,
    pub cache_by_provider: BTreeMap<String, usize>,
    // swept during this very call
    pub cache_cleaned: usize,
    pub cache_ttl_seconds: u64,
    pub series_count: usize,
    pub redirect_count: usize,
    pub prefetching_seasons: usize,
}

#[derive(Serialize, Debug)]
pub struct ClearCacheResponse {
    pub message: String,
    pub cleared: usize,
}
