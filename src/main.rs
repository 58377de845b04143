use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use ros_exporter::config::Config;
use ros_exporter::routeros::ApiConnector;
use ros_exporter::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "ros-exporter", about = "Prometheus exporter for MikroTik RouterOS devices")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ROS_EXPORTER_CONFIG")]
    config: Option<String>,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    listen_address: Option<String>,

    /// Path under which to expose metrics, overrides the config file
    #[arg(long)]
    metrics_path: Option<String>,

    /// Connect and per-command timeout in seconds, overrides the config file
    #[arg(long)]
    scrape_timeout: Option<u64>,

    /// Validate config and exit
    #[arg(long)]
    check: bool,

    /// Print version and exit
    #[arg(short, long)]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("ros-exporter {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    if cli.check {
        println!("Configuration is valid.");
        return Ok(());
    }

    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_address = %config.exporter.listen_address,
        metrics_path = %config.exporter.metrics_path,
        "Starting MikroTik exporter"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Exporter terminated with error");
        return Err(e);
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(addr) = &cli.listen_address {
        config.exporter.listen_address = addr.clone();
    }
    if let Some(path) = &cli.metrics_path {
        config.exporter.metrics_path = path.clone();
    }
    if let Some(secs) = cli.scrape_timeout {
        config.exporter.scrape_timeout_secs = secs;
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.exporter.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let addr: SocketAddr = config
        .exporter
        .listen_address
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.exporter.listen_address))?;

    let state = Arc::new(AppState {
        config,
        connector: Arc::new(ApiConnector),
    });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal, draining connections");
}
