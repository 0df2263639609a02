use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

pub type AppResult<T> = Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    // network error or an unexpected status somewhere along the redirect chain
    #[error("failed to resolve redirect: {0}")]
    RedirectResolution(String),

    // nothing on the provider page looked like a media url
    #[error("failed to extract stream: {0}")]
    Extraction(String),

    #[error("failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RedirectResolution(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ManifestFetch(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::InternalServerErrorWithContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // what the client gets to see, internals stay in the logs
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg) => msg.clone(),
            Self::RedirectResolution(_) => "Failed to resolve redirect".to_string(),
            Self::Extraction(_) => "Failed to extract stream".to_string(),
            Self::ManifestFetch(_) | Self::Upstream(_) => "Upstream request failed".to_string(),
            Self::InternalServerErrorWithContext(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
