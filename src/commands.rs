//! Command execution.

use crate::config::Config;
use crate::output::Formatter;
use crate::Commands;
use colored::Colorize;
use powerctl_client::{
    cancel_pair, CancelHandle, Credentials, GraphQlClient, LiveClient, LiveConfig, StopError,
    Termination, TlsClientConfig,
};
use powerctl_protocol::{Home, TelemetryRecord};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

/// Clears the terminal and moves the cursor home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Executes a data command and returns the formatted output.
///
/// `live` writes records as they arrive and returns an empty string.
pub async fn execute(config: &Config, cmd: Commands) -> Result<String, Box<dyn Error>> {
    let token = config.validate()?;
    let formatter = config.format.formatter();

    match cmd {
        Commands::Home => {
            let client = GraphQlClient::new(token)?;
            let homes = client
                .homes()
                .await
                .map_err(|e| format!("Failed to fetch homes: {}", e))?;

            match select_homes(&homes, config.home_id.as_deref())? {
                Selection::One(home) => Ok(formatter.home(home)),
                Selection::All(homes) => Ok(formatter.homes(homes)),
            }
        }

        Commands::Prices => {
            let client = GraphQlClient::new(token)?;
            let prices = client
                .prices(config.home_id.as_deref())
                .await
                .map_err(|e| format!("Failed to fetch prices: {}", e))?;
            Ok(formatter.prices(&prices))
        }

        Commands::Live {
            home_id,
            count,
            ca_cert,
        } => {
            let target = match resolve_target(home_id, config) {
                Some(id) => id,
                None => {
                    let client = GraphQlClient::new(token)?;
                    client
                        .live_capable_home()
                        .await
                        .map_err(|e| format!("Failed to fetch homes: {}", e))?
                        .map(|home| home.id)
                        .ok_or("No home with Pulse found. Ensure your Tibber Pulse is connected.")?
                }
            };
            let live_config = live_config(ca_cert.as_deref());
            live(live_config, config, token, &target, count, formatter.as_ref()).await?;
            Ok(String::new())
        }

        Commands::Config(_) => unreachable!(), // Handled by setup
    }
}

enum Selection<'a> {
    One(&'a Home),
    All(&'a [Home]),
}

/// Only the configured home when one is set, otherwise all of them.
fn select_homes<'a>(homes: &'a [Home], home_id: Option<&str>) -> Result<Selection<'a>, String> {
    if homes.is_empty() {
        return Err("No homes found".to_string());
    }
    match home_id {
        Some(id) => homes
            .iter()
            .find(|home| home.id == id)
            .map(Selection::One)
            .ok_or_else(|| format!("Home with ID {} not found", id)),
        None => Ok(Selection::All(homes)),
    }
}

/// `--home-id` wins over the configured home. `None` means look one up.
fn resolve_target(flag: Option<String>, config: &Config) -> Option<String> {
    flag.filter(|id| !id.is_empty())
        .or_else(|| config.home_id.clone())
}

/// Default endpoint and timeouts, with the CA bundle from `--ca-cert` if given.
fn live_config(ca_cert: Option<&Path>) -> LiveConfig {
    match ca_cert {
        Some(path) => LiveConfig::default().with_tls(TlsClientConfig::new().with_ca_cert(path)),
        None => LiveConfig::default(),
    }
}

async fn live(
    live_config: LiveConfig,
    config: &Config,
    token: &str,
    target: &str,
    count: Option<u64>,
    formatter: &dyn Formatter,
) -> Result<(), Box<dyn Error>> {
    let (handle, signal) = cancel_pair();
    let watcher = tokio::spawn(cancel_on_shutdown(handle.clone()));

    eprintln!("Connecting to live stream...");
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    let redraw = config.format.redraws();
    let mut received = 0u64;
    let consumer = |record: TelemetryRecord| -> Result<(), StopError> {
        write_record(&mut io::stdout().lock(), formatter, &record, redraw).map_err(StopError::new)?;
        received += 1;
        if count.is_some_and(|limit| received >= limit) {
            tracing::debug!("Received {} record(s), stopping", received);
            handle.cancel();
        }
        Ok(())
    };

    let client = LiveClient::new(live_config);
    let result = client
        .stream(&Credentials::new(token), target, consumer, &signal)
        .await;
    watcher.abort();

    let termination = result.map_err(|e| format!("Stream error: {}", e))?;
    match termination {
        Termination::Completed => {
            eprintln!("{}", "Stream ended by server".dimmed());
            Ok(())
        }
        Termination::Cancelled => Ok(()),
        failed => Err(format!("Stream error: {}", failed).into()),
    }
}

fn write_record<W: Write>(
    out: &mut W,
    formatter: &dyn Formatter,
    record: &TelemetryRecord,
    redraw: bool,
) -> io::Result<()> {
    if redraw {
        out.write_all(CLEAR_SCREEN.as_bytes())?;
    }
    writeln!(out, "{}", formatter.telemetry(record))?;
    out.flush()
}

/// Cancels the stream on Ctrl+C or SIGTERM.
async fn cancel_on_shutdown(handle: CancelHandle) {
    shutdown_signal().await;
    tracing::debug!("Shutdown signal received");
    handle.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
