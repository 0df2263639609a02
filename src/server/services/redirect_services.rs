use async_trait::async_trait;
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::http_services::{DynHttpFetcher, FetchKind};
use crate::{
    config::HopLimitPolicy,
    server::error::{AppResult, Error},
};

pub type DynRedirectResolver = Arc<dyn RedirectResolverTrait + Send + Sync>;

// checked in this order, the first absolute match wins
static JS_REDIRECT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)window\.location\.href\s*=\s*["']([^"']+)["']"#,
        r#"(?i)window\.location\s*=\s*["']([^"']+)["']"#,
        r#"(?i)location\.href\s*=\s*["']([^"']+)["']"#,
        r#"(?i)document\.location\s*=\s*["']([^"']+)["']"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// follows the site's redirect endpoint to whatever provider page it ends up on
#[automock]
#[async_trait]
pub trait RedirectResolverTrait {
    async fn resolve(&self, origin_url: &str) -> AppResult<String>;
}

pub struct RedirectResolverService {
    http: DynHttpFetcher,
    max_hops: usize,
    hop_limit_policy: HopLimitPolicy,
}

impl RedirectResolverService {
    pub fn new(http: DynHttpFetcher, max_hops: usize, hop_limit_policy: HopLimitPolicy) -> Self {
        Self {
            http,
            max_hops,
            hop_limit_policy,
        }
    }
}

/// pulls an absolute `window.location = "..."` style target out of a page
pub fn extract_js_redirect(html: &str) -> Option<String> {
    JS_REDIRECT_PATTERNS.iter().find_map(|re| {
        re.captures(html)
            .map(|caps| caps[1].to_string())
            .filter(|target| target.starts_with("http"))
    })
}

fn join_location(current: &str, location: &str) -> AppResult<String> {
    url::Url::parse(current)
        .and_then(|base| base.join(location))
        .map(|u| u.to_string())
        .map_err(|e| {
            Error::RedirectResolution(format!(
                "bad location {} from {}: {}",
                location, current, e
            ))
        })
}

#[async_trait]
impl RedirectResolverTrait for RedirectResolverService {
    async fn resolve(&self, origin_url: &str) -> AppResult<String> {
        info!("resolving redirect: {}", origin_url);
        let mut current_url = origin_url.to_string();

        for hop in 1..=self.max_hops {
            debug!("hop {}: requesting {}", hop, current_url);

            // no retries, a flaky hop just fails this request and the next one tries again
            let response = self
                .http
                .fetch(&current_url, FetchKind::RedirectHop)
                .await
                .map_err(|e| Error::RedirectResolution(e.to_string()))?;

            if response.is_redirect() {
                if let Some(location) = response.location.as_deref() {
                    current_url = join_location(&current_url, location)?;
                    debug!("http redirect to: {}", current_url);
                    continue;
                }
                error!("{} from {} without a location header", response.status, current_url);
                return Err(Error::RedirectResolution(format!(
                    "{} without location from {}",
                    response.status, current_url
                )));
            }

            if response.status == 200 {
                match extract_js_redirect(&response.body) {
                    Some(target) => {
                        debug!("javascript redirect to: {}", target);
                        current_url = target;
                        continue;
                    }
                    None => {
                        info!("final url reached after {} hops: {}", hop, current_url);
                        return Ok(current_url);
                    }
                }
            }

            warn!("unexpected status {} from {}", response.status, current_url);
            return Err(Error::RedirectResolution(format!(
                "unexpected status {} from {}",
                response.status, current_url
            )));
        }

        match self.hop_limit_policy {
            HopLimitPolicy::ReturnLast => {
                warn!(
                    "too many redirects (>{}), using last url {}",
                    self.max_hops, current_url
                );
                Ok(current_url)
            }
            HopLimitPolicy::Fail => {
                error!("too many redirects (>{}) from {}", self.max_hops, origin_url);
                Err(Error::RedirectResolution(format!(
                    "more than {} redirects from {}",
                    self.max_hops, origin_url
                )))
            }
        }
    }
}
