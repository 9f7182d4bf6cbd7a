//! powerctl - Tibber command-line client
//!
//! Shows homes and electricity prices, and streams live power telemetry
//! from a Tibber Pulse.

mod commands;
mod config;
mod output;
mod setup;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "powerctl")]
#[command(about = "Power consumption and price data from Tibber")]
#[command(
    long_about = "A command-line interface for Tibber power data.\n\n\
    Get real-time power consumption from your Tibber Pulse, view electricity \
    prices, and manage your Tibber homes.\n\n\
    Set your API token via the TIBBER_TOKEN environment variable or in \
    ~/.tibber/config.yaml"
)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.tibber/config.yaml)
    #[arg(short, long, global = true, env = "TIBBER_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show home information
    Home,

    /// Show current, today's and tomorrow's electricity prices
    Prices,

    /// Stream real-time power consumption (Ctrl+C to stop)
    Live {
        /// Home to monitor (default: configured home, then first home with a Pulse)
        #[arg(long)]
        home_id: Option<String>,

        /// Stop after this many measurements
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,

        /// PEM file with CA certificates to trust instead of the bundled roots
        #[arg(long, value_name = "FILE")]
        ca_cert: Option<PathBuf>,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Create the configuration file interactively
    Init,

    /// Show the current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Set a configuration value (keys: token, home_id, format)
    Set {
        /// Key to set
        key: String,

        /// New value
        value: String,
    },

    /// Open the configuration file in $EDITOR
    Edit,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Config(cmd) => setup::execute(cli.config.as_deref(), cmd).await,
        cmd => match Config::load(cli.config.as_deref()) {
            Ok(mut config) => {
                if let Some(format) = cli.format {
                    config.format = format;
                }
                commands::execute(&config, cmd).await
            }
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
