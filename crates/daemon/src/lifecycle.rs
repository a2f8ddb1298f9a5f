// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bq_adapters::{BrokerError, SpoolBroker, TracedBroker};
use bq_core::{JsonConnector, SystemClock};
use bq_engine::{
    Consumer, ConsumerConfig, ConsumerError, ShutdownRequest, SimulatedFactory,
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_POLL_TIMEOUT,
};
use fs2::FileExt;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::env;

/// Broker wrapped with tracing, as the daemon runs it
pub type DaemonBroker = TracedBroker<SpoolBroker>;

pub type DaemonConsumer = Consumer<DaemonBroker, JsonConnector, SystemClock>;

const DEFAULT_QUEUE_ROOT: &str = "bq";
const DEFAULT_CONSUMER_NAME: &str = "bqd";

/// Shape of the simulated jobs the daemon runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub steps: u32,
    pub step_interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            step_interval: Duration::from_millis(500),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/bq)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Optional `bqd.toml`
    pub config_path: PathBuf,
    pub broker_uri: String,
    pub queue_root: String,
    pub consumer_name: String,
    pub beamline: Option<String>,
    pub host_name: Option<String>,
    pub durable: bool,
    pub heartbeat_interval: Duration,
    pub poll_timeout: Duration,
    pub simulation: SimulationConfig,
}

/// On-disk overrides, all optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    broker_uri: Option<String>,
    queue_root: Option<String>,
    consumer_name: Option<String>,
    beamline: Option<String>,
    durable: Option<bool>,
    heartbeat_ms: Option<u64>,
    poll_ms: Option<u64>,
    simulation_steps: Option<u32>,
    simulation_step_ms: Option<u64>,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Defaults, then `bqd.toml` in the state directory, then `BQ_*`
    /// environment overrides.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::load_from(env::state_dir()?)
    }

    pub fn load_from(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let mut config = Self::defaults(state_dir);
        if let Some(file) = read_file_config(&config.config_path)? {
            config.apply_file(file);
        }
        config.apply_env();
        Ok(config)
    }

    fn defaults(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("bqd.pid"),
            log_path: state_dir.join("bqd.log"),
            config_path: state_dir.join("bqd.toml"),
            broker_uri: format!("file://{}", state_dir.join("spool").display()),
            queue_root: DEFAULT_QUEUE_ROOT.to_string(),
            consumer_name: DEFAULT_CONSUMER_NAME.to_string(),
            beamline: None,
            host_name: None,
            durable: true,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            simulation: SimulationConfig::default(),
            state_dir,
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(uri) = file.broker_uri {
            self.broker_uri = uri;
        }
        if let Some(root) = file.queue_root {
            self.queue_root = root;
        }
        if let Some(name) = file.consumer_name {
            self.consumer_name = name;
        }
        if file.beamline.is_some() {
            self.beamline = file.beamline;
        }
        if let Some(durable) = file.durable {
            self.durable = durable;
        }
        if let Some(ms) = file.heartbeat_ms {
            self.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_ms {
            self.poll_timeout = Duration::from_millis(ms);
        }
        if let Some(steps) = file.simulation_steps {
            self.simulation.steps = steps;
        }
        if let Some(ms) = file.simulation_step_ms {
            self.simulation.step_interval = Duration::from_millis(ms);
        }
    }

    fn apply_env(&mut self) {
        if let Some(uri) = env::broker_uri() {
            self.broker_uri = uri;
        }
        if let Some(root) = env::queue_root() {
            self.queue_root = root;
        }
        if let Some(name) = env::consumer_name() {
            self.consumer_name = name;
        }
        if let Some(beamline) = env::beamline() {
            self.beamline = Some(beamline);
        }
        if let Some(durable) = env::durable() {
            self.durable = durable;
        }
        if let Some(interval) = env::heartbeat_interval() {
            self.heartbeat_interval = interval;
        }
        if let Some(timeout) = env::poll_timeout() {
            self.poll_timeout = timeout;
        }
        self.host_name = env::host_name();
    }

    /// Engine settings for the daemon's single consumer
    pub fn consumer_config(&self) -> ConsumerConfig {
        let config = ConsumerConfig::new(self.queue_root.clone())
            .with_name(self.consumer_name.clone())
            .with_durable(self.durable)
            .with_heartbeat_interval(self.heartbeat_interval)
            .with_poll_timeout(self.poll_timeout);
        let config = match &self.beamline {
            Some(beamline) => config.with_beamline(beamline.clone()),
            None => config,
        };
        match &self.host_name {
            Some(host) => config.with_host_name(host.clone()),
            None => config,
        }
    }
}

fn read_file_config(path: &Path) -> Result<Option<FileConfig>, LifecycleError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&text)
        .map(Some)
        .map_err(|source| LifecycleError::Config {
            path: path.to_path_buf(),
            source,
        })
}

/// Running daemon
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub consumer: DaemonConsumer,
}

impl Daemon {
    /// Disconnect the consumer and remove the PID file.
    pub async fn shutdown(self) {
        info!("Shutting down daemon...");
        if let Err(e) = self.consumer.disconnect().await {
            warn!(error = %e, "error disconnecting consumer");
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        // Lock file is released when self.lock_file is dropped
        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Consumer error: {0}")]
    Consumer(#[from] ConsumerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Take the lock, open the broker and start the consumer.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Open without truncating so a running daemon's PID survives a failed lock
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    let spool = SpoolBroker::from_uri(&config.broker_uri)?;
    std::fs::create_dir_all(spool.root())?;
    let broker = TracedBroker::new(spool);
    let consumer = Consumer::new(broker, JsonConnector, SystemClock, config.consumer_config());
    consumer.set_runner(SimulatedFactory::new(
        SystemClock,
        config.simulation.steps,
        config.simulation.step_interval,
    ))?;
    consumer.start().await?;

    info!(
        consumer_id = %consumer.consumer_id(),
        broker = %config.broker_uri,
        queue_root = %config.queue_root,
        "consumer running"
    );

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        consumer,
    })
}

/// Process exit status for a consumer shutdown request
pub fn exit_code(request: ShutdownRequest) -> i32 {
    match request {
        ShutdownRequest::Exit => 0,
        ShutdownRequest::Fatal => 1,
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
