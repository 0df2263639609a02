use anyhow::Context;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use mockall::automock;
use reqwest::header;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::{
    config::AppConfig,
    server::error::{AppResult, Error},
};

pub type DynHttpFetcher = Arc<dyn HttpFetcherTrait + Send + Sync>;

/// what a request is for, decides redirect handling, timeout and headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// single hop of a redirect chain, 3xx responses come back as-is
    RedirectHop,
    /// the provider's embed page
    ProviderPage,
    /// an m3u8 playlist
    Manifest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// everything that leaves the box goes through here
#[automock]
#[async_trait]
pub trait HttpFetcherTrait {
    async fn fetch(&self, url: &str, kind: FetchKind) -> AppResult<FetchResponse>;
}

// we decompress ourselves, br is left out because nothing here can decode it
const ACCEPT_ENCODING: &str = "gzip, zstd";

pub struct ReqwestFetcher {
    redirect_client: reqwest::Client,
    page_client: reqwest::Client,
    manifest_timeout: Duration,
    manifest_referer: Option<String>,
}

impl ReqwestFetcher {
    /// fails instead of handing out a client that would follow redirects or never time out
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let builder = || {
            reqwest::Client::builder()
                .user_agent(config.upstream_user_agent.clone())
                .danger_accept_invalid_certs(config.insecure_upstream_tls)
        };

        // redirects are followed by hand so the js redirects in between can be picked up
        let redirect_client = builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.redirect_timeout_secs))
            .build()
            .context("failed to build the redirect client")?;

        let page_client = builder()
            .timeout(Duration::from_secs(config.page_timeout_secs))
            .build()
            .context("failed to build the page client")?;

        Ok(Self {
            redirect_client,
            page_client,
            manifest_timeout: Duration::from_secs(config.manifest_timeout_secs),
            manifest_referer: config.manifest_referer.clone(),
        })
    }

    fn request(&self, url: &str, kind: FetchKind) -> reqwest::RequestBuilder {
        match kind {
            FetchKind::RedirectHop => self
                .redirect_client
                .get(url)
                .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
                .header(header::ACCEPT_ENCODING, ACCEPT_ENCODING),
            FetchKind::ProviderPage => self
                .page_client
                .get(url)
                .header(
                    header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .header(header::ACCEPT_ENCODING, ACCEPT_ENCODING),
            FetchKind::Manifest => {
                let request = self
                    .page_client
                    .get(url)
                    .timeout(self.manifest_timeout)
                    .header(header::ACCEPT, "*/*")
                    .header(header::ACCEPT_ENCODING, ACCEPT_ENCODING);

                match &self.manifest_referer {
                    Some(referer) => request.header(header::REFERER, referer),
                    None => request,
                }
            }
        }
    }
}

/// undoes whatever content-encoding upstream picked
pub fn decode_body(bytes: &[u8], content_encoding: Option<&str>) -> AppResult<Vec<u8>> {
    match content_encoding {
        Some("zstd") => zstd::decode_all(bytes).map_err(|e| {
            error!("Failed to decompress zstd: {}", e);
            Error::Upstream(format!("failed to decompress zstd body: {}", e))
        }),
        Some("gzip") => {
            let mut decoder = GzDecoder::new(bytes);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed).map_err(|e| {
                error!("Failed to decompress gzip response: {}", e);
                Error::Upstream(format!("failed to decompress gzip body: {}", e))
            })?;
            Ok(decompressed)
        }
        _ => Ok(bytes.to_vec()),
    }
}

#[async_trait]
impl HttpFetcherTrait for ReqwestFetcher {
    async fn fetch(&self, url: &str, kind: FetchKind) -> AppResult<FetchResponse> {
        debug!("GET {} ({:?})", url, kind);

        let response = self.request(url, kind).send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            Error::Upstream(format!("request to {} failed: {}", url, e))
        })?;

        let status = response.status().as_u16();
        let header_value = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let location = header_value(header::LOCATION);
        let content_encoding = header_value(header::CONTENT_ENCODING);

        let bytes = response.bytes().await.map_err(|e| {
            error!("Failed to read response from {}: {}", url, e);
            Error::Upstream(format!("failed to read body of {}: {}", url, e))
        })?;

        let body = decode_body(&bytes, content_encoding.as_deref())?;
        debug!("{} answered {} with {} bytes", url, status, body.len());

        Ok(FetchResponse {
            status,
            location,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
