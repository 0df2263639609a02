use serde::Serialize;

use crate::database::{EpisodeRef, ProviderType};

#[derive(Serialize, Debug)]
pub struct CachedStreamInfo {
    pub stream_url: String,
    pub provider: ProviderType,
    pub expires_in: i64,
}

#[derive(Serialize, Debug)]
pub struct InfoResponse {
    #[serde(flatten)]
    pub episode: EpisodeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<CachedStreamInfo>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Deobfuscation,
    DirectFallback,
}

#[derive(Serialize, Debug)]
pub struct TestResolutionResponse {
    pub redirect_id: String,
    pub redirect_url: String,
    pub provider_url: String,
    pub provider_type: ProviderType,
    pub stream_url: String,
    pub extraction_method: ExtractionMethod,
}

/// a failed /test run still answers 200, the step says where it broke
#[derive(Serialize, Debug)]
pub struct TestFailureResponse {
    pub error: String,
    pub step: &'static str,
}
