use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use adwatch::config::Settings;
use adwatch::extract::HtmlExtractor;
use adwatch::fetch::HttpPageSource;
use adwatch::registry::{MemoryRegistry, Registry, SqliteRegistry};
use adwatch::{AppState, Listings};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("adwatch=info,actix_web=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn open_registry(settings: &Settings) -> Result<Arc<dyn Registry>> {
    match settings.registry_url.as_deref() {
        Some(url) => {
            let registry = SqliteRegistry::connect(url)
                .await
                .with_context(|| format!("opening registry at {url}"))?;
            Ok(Arc::new(registry))
        }
        None => {
            info!("ADWATCH_REGISTRY_URL not set, registry is in-memory");
            Ok(Arc::new(MemoryRegistry::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env().context("reading settings")?;
    let registry = open_registry(&settings).await?;
    let source = HttpPageSource::new(&settings.listing_url, settings.fetch_timeout)
        .context("building http client")?;
    let extractor = HtmlExtractor::new()?;
    let listings = Listings::new(Arc::new(source), Arc::new(extractor));
    let state = web::Data::new(AppState::new(registry.clone(), listings));

    info!(
        host = %settings.host,
        port = settings.port,
        listing_url = %settings.listing_url,
        timeout_secs = settings.fetch_timeout.as_secs(),
        "starting adwatch"
    );
    let served = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(adwatch::routes)
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("binding {}:{}", settings.host, settings.port))?
    .run()
    .await;

    registry.close().await;
    info!("registry closed, bye");
    served.context("http server")
}
