// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: BQ_STATE_DIR > XDG_STATE_HOME/bq > ~/.local/state/bq
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("BQ_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("bq"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/bq"))
}

/// Broker location, e.g. `file:///var/spool/bq`
pub fn broker_uri() -> Option<String> {
    non_empty("BQ_BROKER_URI")
}

pub fn queue_root() -> Option<String> {
    non_empty("BQ_QUEUE_ROOT")
}

pub fn consumer_name() -> Option<String> {
    non_empty("BQ_CONSUMER_NAME")
}

pub fn beamline() -> Option<String> {
    non_empty("BQ_BEAMLINE")
}

/// `BQ_DURABLE`: accepts true/false, 1/0, yes/no
pub fn durable() -> Option<bool> {
    match non_empty("BQ_DURABLE")?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

pub fn heartbeat_interval() -> Option<Duration> {
    millis("BQ_HEARTBEAT_MS")
}

pub fn poll_timeout() -> Option<Duration> {
    millis("BQ_POLL_MS")
}

/// Host name reported on heartbeats
pub fn host_name() -> Option<String> {
    non_empty("HOSTNAME")
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
