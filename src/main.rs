use anyhow::{Context, Result};
use beacond::cli::Cli;
use beacond::config::BeaconConfig;
use beacond::{BeaconClient, BeaconKey, Supervisor};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first to get debug flag
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = BeaconConfig::load(&cli)?;
    let key = BeaconKey::new(config.scope.as_deref());
    let client = BeaconClient::new(&config, &key).context("Failed to set up beacon client")?;

    println!("🛰️  beacond started");
    println!("🔑 Beacon key: {}", key);
    println!("📡 Beacon URL: {}", client.url());
    println!("⏱️  Heartbeat interval: {:?}", config.interval);

    let supervisor = Supervisor::new(config, client);
    let code = supervisor
        .run(&cli.command)
        .await
        .context("Failed to supervise agent")?;

    std::process::exit(code);
}
