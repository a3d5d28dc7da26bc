use agentcloud::adapters::metrics_handler::MetricsCollector;
use agentcloud::cli::Cli;
use agentcloud::config::{watcher::ConfigWatcher, Settings, RULESETS_DIR};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    if cli.check {
        info!(
            "Configuration OK: {} rule sets, server {}:{}",
            settings.rulesets.len(),
            settings.server.host,
            settings.server.port
        );
        return Ok(());
    }

    let host = settings.server.host.clone();
    let port = settings.server.port;
    info!("Starting Agentcloud forms service on {}:{}", host, port);

    let metrics = Arc::new(MetricsCollector::new()?);

    // Wrap settings in Arc<RwLock> for live reload
    let settings = Arc::new(RwLock::new(settings));

    let root = cli
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let paths = vec![cli.config.clone(), root.join(RULESETS_DIR)];

    let settings_for_watcher = settings.clone();
    let metrics_for_watcher = metrics.clone();
    let cli_for_watcher = cli.clone();
    let _watcher = ConfigWatcher::new(paths, move || match Settings::new_with_cli(&cli_for_watcher) {
        Ok(new_settings) => {
            let count = new_settings.rulesets.len();
            let mut w = settings_for_watcher.blocking_write();
            *w = new_settings;
            metrics_for_watcher.config_reloads.with_label_values(&["ok"]).inc();
            info!("Configuration reloaded successfully ({} rule sets)", count);
        }
        Err(e) => {
            metrics_for_watcher.config_reloads.with_label_values(&["error"]).inc();
            error!("Failed to reload configuration: {}", e);
        }
    })?;

    let app = agentcloud::create_app(settings, metrics).await;

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
