use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use meterstyle_core::{ConfigStorage, DirStore, FileConfigStorage};
use meterstyle_providers::{build_heartbeat, build_meter};
use meterstyle_server::{create_router, PageConfig, PortalServer, ServerConfig, ServerState};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_PATH: &str = "meterstyle.json";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,meterstyle_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Meterstyle portal starting...");

    // Configuration
    let config_path = config_path();
    let storage = FileConfigStorage::new(&config_path);
    let settings = storage
        .load_settings_or_default()
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
    settings.validate().context("Invalid settings")?;

    let bind_addr: SocketAddr = settings
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", settings.bind_addr()))?;

    let documents_dir = PathBuf::from(settings.documents_dir());
    if !documents_dir.is_dir() {
        tracing::warn!(
            "Documents directory {} does not exist, the style list will be empty",
            documents_dir.display()
        );
    }

    let meter = build_meter(&settings.meter()).context("Failed to open meter")?;
    let heartbeat = build_heartbeat(settings.heartbeat_led.as_deref());

    let page = PageConfig {
        title: settings.page_title().to_string(),
        uri: settings.page_uri().to_string(),
    };
    tracing::info!("   Page:      http://{}{}", bind_addr, page.uri);
    tracing::info!("   Telemetry: http://{}/pzem.json", bind_addr);
    let store = DirStore::new(documents_dir);
    tracing::info!("   Styles:    {}", store.root().display());

    let state = ServerState::new(page, Box::new(store), meter);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let config = ServerConfig {
        bind_addr,
        heartbeat: Duration::from_millis(settings.heartbeat_ms()),
    };
    PortalServer::new(config, app, heartbeat).run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Settings file: first argument, then `METERSTYLE_CONFIG`, then the default.
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("METERSTYLE_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
