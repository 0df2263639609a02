use axum::{
    Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use flate2::{Compression, write::GzEncoder};
use std::io::Write;
use tracing::{debug, error, info, warn};

use crate::server::{
    error::{AppResult, Error},
    extractors::ClientContext,
    services::resolution_services::StreamResolution,
};

pub const M3U8_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// how the manifest goes out when the client asks for compression
#[derive(Debug, Clone, Copy, PartialEq)]
enum ManifestCompression {
    Zstd,
    Gzip,
}

impl ManifestCompression {
    /// jellyfin's ffmpeg sends nothing or "identity", browsers send everything. zstd wins when
    /// both are on offer
    fn negotiate(headers: &HeaderMap) -> Option<Self> {
        let accepted = headers.get(header::ACCEPT_ENCODING)?.to_str().ok()?;
        let mut codings = accepted
            .split(',')
            .filter_map(|coding| coding.split(';').next())
            .map(str::trim);

        if codings.clone().next() == Some("identity") {
            return None;
        }
        if codings.clone().any(|c| c == "zstd") {
            Some(Self::Zstd)
        } else if codings.any(|c| c == "gzip") {
            Some(Self::Gzip)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
            Self::Gzip => "gzip",
        }
    }

    fn encode(self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Zstd => zstd::encode_all(data, 3),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
        }
    }
}

/// plain 302, axum's `Redirect` only does 303/307/308
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub struct StreamController;

impl StreamController {
    pub fn app() -> Router {
        Router::new()
            .route("/redirect/{redirect_id}", get(Self::stream_redirect))
            .route("/direct/{redirect_id}", get(Self::stream_direct))
    }

    fn build_m3u8_response(body: String, headers: &HeaderMap) -> AppResult<Response> {
        let playlist_headers = [
            (header::CONTENT_TYPE, M3U8_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ];

        let Some(compression) = ManifestCompression::negotiate(headers) else {
            return Ok((StatusCode::OK, playlist_headers, body).into_response());
        };

        let compressed = compression.encode(body.as_bytes()).map_err(|e| {
            error!("failed to compress the manifest with {}: {}", compression.name(), e);
            Error::InternalServerErrorWithContext("Failed to compress response".to_string())
        })?;
        debug!(
            "manifest {} -> {} bytes with {}",
            body.len(),
            compressed.len(),
            compression.name()
        );

        Ok((
            StatusCode::OK,
            playlist_headers,
            [(header::CONTENT_ENCODING, compression.name())],
            compressed,
        )
            .into_response())
    }

    /// main jellyfin entry point, answers with the master playlist made absolute
    async fn stream_redirect(
        ClientContext(client_id, services): ClientContext,
        Path(redirect_id): Path<String>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        info!("stream request for {} from {}", redirect_id, client_id);

        let resolution = services.resolution.resolve_stream(&redirect_id).await?;

        let media_url = match &resolution.stream {
            StreamResolution::Cached(entry) | StreamResolution::Resolved(entry) => {
                entry.stream_url.clone()
            }
            StreamResolution::ProviderOnly { provider_url, .. } => {
                warn!("no m3u8 for {}, redirecting to provider page", redirect_id);
                return Ok(found(provider_url));
            }
        };

        match services.playlist.fetch_rewritten(&media_url).await {
            Ok(manifest) => Self::build_m3u8_response(manifest.body, &headers),
            Err(e) => {
                warn!("manifest rewrite failed for {}, plain redirect: {}", redirect_id, e);
                Ok(found(&media_url))
            }
        }
    }

    /// for players that follow redirects on their own, no playlist fetch at all
    async fn stream_direct(
        ClientContext(client_id, services): ClientContext,
        Path(redirect_id): Path<String>,
    ) -> AppResult<Response> {
        info!("direct stream request for {} from {}", redirect_id, client_id);

        let resolution = services.resolution.resolve_stream(&redirect_id).await?;

        match resolution.stream.media_url() {
            Some(media_url) => Ok(found(media_url)),
            None => Err(Error::Extraction(format!(
                "no media url for redirect {}",
                redirect_id
            ))),
        }
    }
}
