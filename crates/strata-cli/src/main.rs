use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use strata_cli::{
    cli::{Cli, Commands, LogLevel},
    commands, config,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::CliConfig::load(cli.config.clone())?;

    // Explicit flags win over RUST_LOG; the config level is only a default
    let filter = match cli.requested_log_level() {
        Some(level) => EnvFilter::default().add_directive(LevelFilter::from(level).into()),
        None => EnvFilter::builder()
            .with_default_directive(
                LevelFilter::from(config.logging.level.unwrap_or(LogLevel::Warn)).into(),
            )
            .from_env_lossy(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(config = ?cli.config, "Loaded configuration");

    let output = match cli.command {
        Commands::Normalize { input } => commands::normalize_request(input)?,
        Commands::Compile { input, format } => commands::compile_request(&config, input, format)?,
        Commands::Config => commands::show_config(&config)?,
    };
    println!("{output}");
    Ok(())
}
