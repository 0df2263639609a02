use tracing::{debug, error};
use url::Url;

use crate::server::error::{AppResult, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenManifest {
    pub body: String,
    pub rewritten_lines: usize,
}

/// turns every relative uri line of an m3u8 into an absolute one against the manifest's own
/// directory. Tags, comments, blank lines and absolute urls are left alone, and the line count
/// never changes because players pair tags with the line that follows them
pub fn rewrite_manifest(text: &str, manifest_url: &str) -> AppResult<RewrittenManifest> {
    let mut base = Url::parse(manifest_url).map_err(|e| {
        error!("Failed to parse manifest URL: {}", e);
        Error::ManifestFetch(format!("invalid manifest url {}: {}", manifest_url, e))
    })?;
    // the token on the master playlist doesn't belong to the variants
    base.set_query(None);
    base.set_fragment(None);

    let mut rewritten_lines = 0;

    // split on \n by hand, str::lines() would swallow a trailing empty line
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || !trimmed.contains('.') {
                return line.to_string();
            }

            if trimmed.starts_with("http") {
                return line.to_string();
            }

            match base.join(trimmed) {
                Ok(resolved) => {
                    rewritten_lines += 1;
                    debug!("Rewrote {} -> {}", trimmed, resolved);
                    resolved.to_string()
                }
                Err(e) => {
                    error!("Failed to resolve: {} - {}", trimmed, e);
                    line.to_string()
                }
            }
        })
        .collect();

    Ok(RewrittenManifest {
        body: lines.join("\n"),
        rewritten_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_lines_become_absolute() {
        let manifest = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nindex-v1-a1.m3u8?t=abc\n";
        let out = rewrite_manifest(
            manifest,
            "https://cdn.example.net/engine/hls2/01/abc/master.m3u8?t=xyz",
        )
        .unwrap();

        assert_eq!(
            out.body,
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nhttps://cdn.example.net/engine/hls2/01/abc/index-v1-a1.m3u8?t=abc\n"
        );
        assert_eq!(out.rewritten_lines, 1);
    }

    #[test]
    fn root_relative_lines_join_against_the_host() {
        let out = rewrite_manifest("/seg/1.ts", "https://cdn.example.net/a/b/master.m3u8").unwrap();
        assert_eq!(out.body, "https://cdn.example.net/seg/1.ts");
    }

    #[test]
    fn absolute_and_tag_lines_pass_through() {
        let manifest = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\nhttps://other.example/x.ts\n\n";
        let out = rewrite_manifest(manifest, "https://cdn.example.net/a/master.m3u8").unwrap();

        assert_eq!(out.body, manifest);
        assert_eq!(out.rewritten_lines, 0);
    }

    #[test]
    fn carriage_returns_do_not_leak_into_urls() {
        let out =
            rewrite_manifest("#EXTM3U\r\nseg-1.ts\r\n", "https://cdn.example.net/a/master.m3u8")
                .unwrap();
        assert_eq!(
            out.body,
            "#EXTM3U\r\nhttps://cdn.example.net/a/seg-1.ts\n"
        );
    }

    #[test]
    fn bad_base_url_is_an_error() {
        assert!(rewrite_manifest("seg.ts", "not a url").is_err());
    }
}
