use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gluestick::{
    config::Config,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "gluestick")]
#[command(version)]
#[command(about = "Upload, map, validate and export CSV files over HTTP")]
#[command(long_about = None)]
struct Cli {
    /// Optional TOML configuration file; GLUESTICK_* variables take precedence
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("gluestick={},tower_http=trace", cli.log_level)
    } else {
        format!("gluestick={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gluestick v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    info!("Using data directory: {}", config.storage.data_dir.display());
    config.log_notices();

    let state = AppState::from_config(&config).await?;
    let web_server = WebServer::new(&config, state)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
