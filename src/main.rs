use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

use streaming_api::{
    AppConfig, AppServices, ApplicationServer, CatalogRepository, DynCatalogRepository, Logger,
    LookupTable,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // guards live as long as main so the log writer and sentry get flushed on the way out
    let _guards = Logger::init(config.cargo_env, &config.log_dir, config.sentry_dsn.clone());

    info!("logger and env prepped, loading catalog...");

    let files = match &config.data_files {
        Some(files) => files.iter().map(PathBuf::from).collect(),
        None => LookupTable::discover_files(Path::new(&config.data_dir))
            .with_context(|| format!("failed to scan {}", config.data_dir))?,
    };

    let catalog = LookupTable::load(&files, &config.preferred_language)
        .context("failed to load the catalog")?;
    let stats = catalog.stats();
    info!(
        "catalog loaded: {} series, {} redirect ids from {} sites",
        stats.total_series,
        stats.total_redirects,
        stats.sites.len()
    );
    let catalog = Arc::new(catalog) as DynCatalogRepository;

    let mut services = AppServices::new(catalog, config.clone())
        .context("failed to set up the upstream http clients")?;
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => services = services.with_metrics(handle),
        Err(e) => warn!("prometheus recorder not installed, /metrics is off: {}", e),
    }

    ApplicationServer::serve(config, services)
        .await
        .context("server failed to start")?;

    Ok(())
}
