use anyhow::{Context, Result};
use asm2bristol::{cli::Cli, convert_file, logging::init_tracing};
use clap::Parser;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.config().context("failed to load config")?;

    // Set up tracing for logging
    init_tracing(&config.logging).context("failed to set up tracing")?;

    debug!("config loaded: {:?}", config);

    convert_file(&cli.path, &config)
        .with_context(|| format!("failed to convert {}", cli.path.display()))?;

    Ok(())
}
