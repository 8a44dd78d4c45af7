use anyhow::Result;
use oxdash_storage::AlertStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use oxdash_server::app;
use oxdash_server::config;
use oxdash_server::seed;
use oxdash_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  oxdash-server [config.toml]                               Start the server");
    eprintln!("  oxdash-server init-alerts <config.toml> <seed.json>       Load dashboards and alert rules from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oxdash=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-alerts") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-alerts requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-alerts requires <seed.json> argument")
            })?;
            run_init_alerts(config_path, seed_path)
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

fn run_init_alerts(config_path: &str, seed_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;
    let store = AlertStore::new(Path::new(&config.data_dir))?;
    let summary = seed::init_from_seed_file(&store, Path::new(seed_path))?;
    tracing::info!(
        dashboards = summary.dashboards,
        alerts = summary.alerts,
        "init-alerts finished"
    );
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.data_dir,
        org_header = %config.org_header,
        "oxdash-server starting"
    );

    let store = Arc::new(AlertStore::new(Path::new(&config.data_dir))?);
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState::new(store, config);

    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    if let Err(e) = axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    tracing::info!("Server stopped");
    Ok(())
}
