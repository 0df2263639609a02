use tracing::{error, info};

use super::http_services::{DynHttpFetcher, FetchKind};
use crate::server::{
    error::{AppResult, Error},
    utils::playlist_utils::{RewrittenManifest, rewrite_manifest},
};

#[derive(Clone)]
pub struct PlaylistService {
    http: DynHttpFetcher,
}

impl PlaylistService {
    pub fn new(http: DynHttpFetcher) -> Self {
        Self { http }
    }

    /// fetches the manifest and makes every segment/variant uri absolute. Any error here is a
    /// `ManifestFetch`, the stream route turns that into a plain redirect to the manifest
    pub async fn fetch_rewritten(&self, manifest_url: &str) -> AppResult<RewrittenManifest> {
        let response = self
            .http
            .fetch(manifest_url, FetchKind::Manifest)
            .await
            .map_err(|e| Error::ManifestFetch(e.to_string()))?;

        if !response.is_success() {
            error!("manifest {} answered {}", manifest_url, response.status);
            return Err(Error::ManifestFetch(format!(
                "manifest answered {}",
                response.status
            )));
        }

        info!("fetched m3u8 content: {} chars", response.body.len());

        let rewritten = rewrite_manifest(&response.body, manifest_url)?;
        info!(
            "fixed {} relative urls to absolute urls",
            rewritten.rewritten_lines
        );

        Ok(rewritten)
    }
}
