mod config;
mod http;
mod relay;
mod ttn;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay::DownlinkRelay;
use ttn::TtnClient;

#[derive(Parser)]
#[command(name = "plant-downlink-relay")]
#[command(about = "Relays plant-type settings from IoT telemetry exports to TTN downlinks")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; on Azure it usually comes from app settings alone
    let mut config = config::Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from {:?}: {}", cli.config, e);
        eprintln!("Using default configuration");
        config::Config::default()
    });
    config.apply_env();

    init_tracing(&config.logging);

    info!("plant-downlink-relay v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    let client = TtnClient::new(config.ttn.clone()).context("failed to set up TTN client")?;
    let app = http::router(DownlinkRelay::new(client), &config.server.route);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        "Listening on {} (relay route: POST {})",
        addr, config.server.route
    );

    http::serve(listener, app).await
}

fn init_tracing(logging: &config::LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
