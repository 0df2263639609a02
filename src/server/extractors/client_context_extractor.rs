use axum::Extension;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use tracing::debug;

use crate::server::error::Error;
use crate::server::services::AppServices;

/// services plus a stable id for whoever is asking, the id only ever shows up in logs
pub struct ClientContext(pub String, pub AppServices);

/// hashes ip and user-agent, jellyfin clients behind the same box get the same id
pub fn generate_client_id(ip: Option<&str>, user_agent: Option<&str>) -> String {
    let mut hasher = DefaultHasher::new();
    ip.unwrap_or("unknown").hash(&mut hasher);
    user_agent.unwrap_or("unknown").hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

fn client_ip(parts: &Parts) -> Option<String> {
    let header = |name: &str| parts.headers.get(name).and_then(|h| h.to_str().ok());

    header("x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| header("x-real-ip").map(|s| s.to_string()))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(services): Extension<AppServices> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|err| Error::InternalServerErrorWithContext(err.to_string()))?;

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok());
        let ip = client_ip(parts);

        let client_id = generate_client_id(ip.as_deref(), user_agent);
        debug!("client {} from ip {:?}", client_id, ip);

        Ok(ClientContext(client_id, services))
    }
}
