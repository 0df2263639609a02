use std::sync::Arc;

use streaming_api::server::error::Error;
use streaming_api::server::services::http_services::{
    DynHttpFetcher, FetchKind, FetchResponse, MockHttpFetcherTrait,
};
use streaming_api::server::services::playlist_services::PlaylistService;
use streaming_api::server::utils::playlist_utils::rewrite_manifest;

const MANIFEST_URL: &str =
    "https://delivery-node-7.example-cdn.net/engine/hls2/01/08123/abcd1234_,n,.urlset/master.m3u8?t=Zx9&s=1700000000";

// 10 lines, 4 of them relative uris
const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=400000,RESOLUTION=640x360
index-f1-v1-a1.m3u8?t=abc
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1280x720
index-f2-v1-a1.m3u8?t=abc
#EXT-X-STREAM-INF:BANDWIDTH=1600000,RESOLUTION=1920x1080
sub/index-f3-v1-a1.m3u8
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",URI=\"audio.m3u8\"
../shared/iframes.m3u8
https://mirror.example.net/index-f4-v1-a1.m3u8";

const BASE: &str = "https://delivery-node-7.example-cdn.net/engine/hls2/01/08123/abcd1234_,n,.urlset/";

#[test]
fn test_relative_lines_are_made_absolute() {
    assert_eq!(MASTER.split('\n').count(), 10);

    let rewritten = rewrite_manifest(MASTER, MANIFEST_URL).unwrap();
    let lines: Vec<&str> = rewritten.body.split('\n').collect();

    assert_eq!(rewritten.rewritten_lines, 4);
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[2], format!("{BASE}index-f1-v1-a1.m3u8?t=abc"));
    assert_eq!(lines[4], format!("{BASE}index-f2-v1-a1.m3u8?t=abc"));
    assert_eq!(lines[6], format!("{BASE}sub/index-f3-v1-a1.m3u8"));
    assert_eq!(
        lines[8],
        "https://delivery-node-7.example-cdn.net/engine/hls2/01/08123/shared/iframes.m3u8"
    );
}

#[test]
fn test_tags_and_absolute_urls_are_untouched() {
    let rewritten = rewrite_manifest(MASTER, MANIFEST_URL).unwrap();
    let original: Vec<&str> = MASTER.split('\n').collect();
    let lines: Vec<&str> = rewritten.body.split('\n').collect();

    for idx in [0, 1, 3, 5, 7, 9] {
        assert_eq!(lines[idx], original[idx]);
    }
}

#[test]
fn test_trailing_newline_survives() {
    let rewritten = rewrite_manifest("#EXTM3U\nseg-1.ts\n", MANIFEST_URL).unwrap();
    assert_eq!(rewritten.body, format!("#EXTM3U\n{BASE}seg-1.ts\n"));
}

#[test]
fn test_lines_without_a_dot_are_left_alone() {
    let rewritten = rewrite_manifest("#EXTM3U\nsegment\n", MANIFEST_URL).unwrap();
    assert_eq!(rewritten.body, "#EXTM3U\nsegment\n");
    assert_eq!(rewritten.rewritten_lines, 0);
}

#[tokio::test]
async fn test_service_fetches_and_rewrites() {
    let mut http = MockHttpFetcherTrait::new();
    http.expect_fetch()
        .withf(|url, kind| url == MANIFEST_URL && *kind == FetchKind::Manifest)
        .times(1)
        .returning(|_, _| {
            Ok(FetchResponse {
                status: 200,
                body: MASTER.to_string(),
                ..Default::default()
            })
        });

    let service = PlaylistService::new(Arc::new(http) as DynHttpFetcher);
    let rewritten = service.fetch_rewritten(MANIFEST_URL).await.unwrap();

    assert_eq!(rewritten.rewritten_lines, 4);
}

#[tokio::test]
async fn test_service_reports_bad_statuses_as_manifest_failures() {
    let mut http = MockHttpFetcherTrait::new();
    http.expect_fetch().times(1).returning(|_, _| {
        Ok(FetchResponse {
            status: 403,
            ..Default::default()
        })
    });

    let service = PlaylistService::new(Arc::new(http) as DynHttpFetcher);

    assert!(matches!(
        service.fetch_rewritten(MANIFEST_URL).await,
        Err(Error::ManifestFetch(_))
    ));
}
