use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use recenzione_gateway::cache::FileCache;
use recenzione_gateway::catalog::Catalog;
use recenzione_gateway::config::Args;
use recenzione_gateway::generator::ReviewRequestGenerator;
use recenzione_gateway::handlers;
use recenzione_gateway::kobold::KoboldClient;
use recenzione_gateway::settings::{JsonFileSettings, SettingsProvider, apply_env_overrides};
use recenzione_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();

    let settings: Arc<dyn SettingsProvider> = Arc::new(JsonFileSettings::new(&args.settings_file));
    if let Err(e) = apply_env_overrides(settings.as_ref()) {
        warn!(error = %e, "could not persist backend URL from environment");
    }

    let catalog = Arc::new(
        Catalog::load(&args.catalog_file)
            .with_context(|| format!("loading catalog from {}", args.catalog_file.display()))?,
    );

    let client = KoboldClient::new(reqwest::Client::new(), settings.clone());
    let cache = FileCache::new(&args.cache_dir, Duration::from_secs(args.cache_ttl));
    let generator = ReviewRequestGenerator::new(client, cache, catalog.clone());

    // creating shared state
    let state = Arc::new(AppState {
        generator,
        catalog,
        settings,
    });
    let backend = state.generator.client().resolve_config(None).await;

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("Gateway running on http://localhost:{}", args.port);
    info!("Generation backend at {}", backend.base_url);
    info!("Cache in {} (TTL {} seconds)", args.cache_dir.display(), args.cache_ttl);

    axum::serve(listener, app).await?;
    Ok(())
}
