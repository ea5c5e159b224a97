use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format of `compile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// The full rendered statement
    #[default]
    Cypher,
    /// Every compiled artifact as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "strata - compile search DSL requests into property-graph queries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/strata/config.toml)
    #[arg(short = 'C', long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Level requested on the command line, if any.
    pub fn requested_log_level(&self) -> Option<LogLevel> {
        self.log_level
            .or_else(|| self.verbose.then_some(LogLevel::Debug))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a request with object-shaped logical groups rewritten as arrays
    Normalize {
        /// Request file (reads stdin when omitted or `-`)
        input: Option<PathBuf>,
    },

    /// Compile a search request
    Compile {
        /// Request file (reads stdin when omitted or `-`)
        input: Option<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Cypher)]
        format: OutputFormat,
    },

    /// Print the effective configuration as TOML
    Config,
}
