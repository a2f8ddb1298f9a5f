// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bq Daemon (bqd)
//!
//! Hosts one consumer on the configured broker and turns its shutdown
//! requests into a process exit status.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::Path;

use bq_daemon::{exit_code, lifecycle, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("bqd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("bqd {}", env!("CARGO_PKG_VERSION"));
                println!("bq Daemon - consumes jobs from a broker submission queue and runs them");
                println!();
                println!("USAGE:");
                println!("    bqd");
                println!();
                println!("Configuration is read from bqd.toml in the state directory");
                println!("($BQ_STATE_DIR, $XDG_STATE_HOME/bq or ~/.local/state/bq) and");
                println!("overridden by BQ_* environment variables.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: bqd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config.log_path)?;

    let log_guard = setup_logging(&config.log_path)?;

    info!("Starting bq daemon");

    let daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("bqd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config.log_path, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut requests = daemon.consumer.shutdown_requests();

    info!(queue_root = %config.queue_root, "Daemon ready");
    println!("READY");

    let code = loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break 0;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break 0;
            }
            changed = requests.changed() => {
                if changed.is_err() {
                    error!("Consumer shutdown channel closed");
                    break 1;
                }
                let request = *requests.borrow_and_update();
                if let Some(request) = request {
                    info!(request = ?request, "Consumer requested shutdown");
                    break exit_code(request);
                }
            }
        }
    };

    daemon.shutdown().await;
    info!(code, "Daemon stopped");
    drop(log_guard);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- bqd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- bqd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(log_path: &Path) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(log_path: &Path, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(
        dir,
        log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
