use chrono::{DateTime, Utc};
use serde::Serialize;

/// the hosters a redirect chain can end up on, decided purely by domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Voe,
    Doodstream,
    Vidoza,
    Unknown,
}

// voe burns through domains every few weeks, the redirect domains are the ones the embed pages
// bounce through before landing on the player
const VOE_DOMAINS: &[&str] = &[
    "voe.sx",
    "voe.to",
    "voe.cx",
    "jilliandescribecompany.com",
    "mikaylaarealike.com",
];
const DOODSTREAM_DOMAINS: &[&str] = &["doodstream.com", "dood.to", "dood.ws", "dood.li", "doply.net"];
const VIDOZA_DOMAINS: &[&str] = &["vidoza.net", "videzz.net"];

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voe => "voe",
            Self::Doodstream => "doodstream",
            Self::Vidoza => "vidoza",
            Self::Unknown => "unknown",
        }
    }

    /// classifies a resolved provider url by its hostname, subdomains of a listed domain count
    pub fn from_url(url: &str) -> Self {
        let Some(host) = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        else {
            return Self::Unknown;
        };

        let matches = |domains: &[&str]| {
            domains
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
        };

        if matches(VOE_DOMAINS) {
            Self::Voe
        } else if matches(DOODSTREAM_DOMAINS) {
            Self::Doodstream
        } else if matches(VIDOZA_DOMAINS) {
            Self::Vidoza
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a resolved media url. Entries are replaced wholesale, never edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub stream_url: String,
    pub provider: ProviderType,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn expires_in_seconds(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_domains() {
        assert_eq!(
            ProviderType::from_url("https://voe.sx/e/abc"),
            ProviderType::Voe
        );
        assert_eq!(
            ProviderType::from_url("https://jilliandescribecompany.com/e/9mm6ogyerorg"),
            ProviderType::Voe
        );
        assert_eq!(
            ProviderType::from_url("https://www.dood.li/e/xyz"),
            ProviderType::Doodstream
        );
        assert_eq!(
            ProviderType::from_url("https://videzz.net/embed-4rb4ir9xqfpu.html"),
            ProviderType::Vidoza
        );
    }

    #[test]
    fn unmatched_and_garbage_are_unknown() {
        assert_eq!(
            ProviderType::from_url("https://streamtape.com/e/1"),
            ProviderType::Unknown
        );
        // lookalike that only contains the domain as a substring
        assert_eq!(
            ProviderType::from_url("https://notvoe.sx.evil.example/e/1"),
            ProviderType::Unknown
        );
        assert_eq!(ProviderType::from_url("not a url"), ProviderType::Unknown);
    }

    #[test]
    fn provider_serializes_lowercase() {
        let json = serde_json::to_string(&ProviderType::Doodstream).unwrap();
        assert_eq!(json, "\"doodstream\"");
    }
}
