mod cli;

use crate::cli::app::{App, Cli};
use anyhow::{Context, Result};
use clap::Parser;
use docintegrity::IntegrityConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = IntegrityConfig::from_env().context("failed to load configuration")?;
    let app = App::open(&cli.fixtures, config).await?;
    let output = app.run(cli.command).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to render output")?
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docintegrity=warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
