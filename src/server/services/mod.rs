pub mod app_services;
pub mod extractor_services;
pub mod http_services;
pub mod playlist_services;
pub mod redirect_services;
pub mod resolution_services;

pub use app_services::AppServices;
pub use extractor_services::DynStreamExtractor;
pub use http_services::DynHttpFetcher;
pub use redirect_services::DynRedirectResolver;
