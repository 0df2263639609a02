use async_trait::async_trait;
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::http_services::{DynHttpFetcher, FetchKind};
use crate::server::utils::deobfuscation_utils::{deobfuscate, find_string_containing};

pub type DynStreamExtractor = Arc<dyn StreamExtractorTrait + Send + Sync>;

/// only the master playlist is any use to jellyfin, variant playlists expire on their own
pub const MANIFEST_MARKER: &str = "master.m3u8";

// shorter arrays are things like ["an"] or ["cn"], never the payload
const MIN_CANDIDATE_LEN: usize = 50;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("Static selector should parse"));

static PAYLOAD_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\["[^"]+"\]"#).expect("Static regex should parse"));

static DIRECT_MANIFEST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^"'\s]+\.m3u8[^"'\s]*"#).expect("Static regex should parse")
});

#[automock]
#[async_trait]
pub trait StreamExtractorTrait {
    /// direct media url hidden in a provider page, `None` when nothing usable was found
    async fn extract_media_url(&self, provider_page_url: &str) -> Option<String>;
}

pub struct VoeExtractorService {
    http: DynHttpFetcher,
}

impl VoeExtractorService {
    pub fn new(http: DynHttpFetcher) -> Self {
        Self { http }
    }
}

/// pulls every long `["..."]` literal out of the page's inline scripts
pub fn payload_candidates(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&SCRIPT_SELECTOR)
        .flat_map(|script| {
            let body: String = script.text().collect();
            PAYLOAD_CANDIDATE
                .find_iter(&body)
                .map(|m| m.as_str().to_string())
                .filter(|candidate| candidate.len() >= MIN_CANDIDATE_LEN)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// the whole extraction minus the network: deobfuscated payloads first, raw page text second
pub fn find_media_url(html: &str) -> Option<String> {
    for candidate in payload_candidates(html) {
        let value = match deobfuscate(&candidate) {
            Ok(value) => value,
            Err(e) => {
                debug!("candidate ({} chars) is a decoy: {}", candidate.len(), e);
                continue;
            }
        };

        if !(value.is_object() || value.is_array()) {
            continue;
        }

        if let Some(url) = find_string_containing(&value, MANIFEST_MARKER) {
            info!("extracted master m3u8 from payload: {}", url);
            return Some(url.to_string());
        }
    }

    // older pages still ship the url in plain text
    let direct = DIRECT_MANIFEST_URL
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|url| url.contains(MANIFEST_MARKER))?;

    info!("found direct master m3u8 url: {}", direct);
    Some(direct.to_string())
}

#[async_trait]
impl StreamExtractorTrait for VoeExtractorService {
    async fn extract_media_url(&self, provider_page_url: &str) -> Option<String> {
        info!("extracting m3u8 from {}", provider_page_url);

        let page = match self
            .http
            .fetch(provider_page_url, FetchKind::ProviderPage)
            .await
        {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                error!("provider page {} answered {}", provider_page_url, page.status);
                return None;
            }
            Err(e) => {
                error!("provider page request failed: {}", e);
                return None;
            }
        };

        let found = find_media_url(&page.body);
        if found.is_none() {
            warn!("could not find master m3u8 in {}", provider_page_url);
        }
        found
    }
}
