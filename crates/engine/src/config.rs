// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer configuration

use bq_core::{ConsumerId, HeartbeatBean, QueueNames};
use std::time::Duration;

/// Bounded wait for one submission
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
/// Backoff between reconnect attempts
pub const DEFAULT_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(2);
/// Accumulated downtime after which the broker is considered gone for good
pub const DEFAULT_DOWNTIME_CEILING: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
/// Pause between a kill order and the exit request
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_millis(2500);
/// Finished job ids remembered for duplicate and late-update checks
pub const DEFAULT_ID_MEMORY: usize = 10_000;

/// Settings for one [`Consumer`](crate::Consumer)
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Prefix every destination name is derived from
    pub queue_root: String,
    pub consumer_id: ConsumerId,
    pub name: String,
    pub beamline: Option<String>,
    pub host_name: Option<String>,
    /// Survive transient broker errors instead of stopping the receive loop
    pub durable: bool,
    pub poll_timeout: Duration,
    pub notification_interval: Duration,
    pub downtime_ceiling: Duration,
    pub heartbeat_interval: Duration,
    pub exit_grace: Duration,
    pub id_memory: usize,
}

impl ConsumerConfig {
    pub fn new(queue_root: impl Into<String>) -> Self {
        Self {
            queue_root: queue_root.into(),
            consumer_id: ConsumerId::random(),
            name: "Consumer".to_string(),
            beamline: None,
            host_name: None,
            durable: true,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            notification_interval: DEFAULT_NOTIFICATION_INTERVAL,
            downtime_ceiling: DEFAULT_DOWNTIME_CEILING,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            exit_grace: DEFAULT_EXIT_GRACE,
            id_memory: DEFAULT_ID_MEMORY,
        }
    }

    pub fn with_consumer_id(mut self, consumer_id: impl Into<ConsumerId>) -> Self {
        self.consumer_id = consumer_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_beamline(mut self, beamline: impl Into<String>) -> Self {
        self.beamline = Some(beamline.into());
        self
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_notification_interval(mut self, interval: Duration) -> Self {
        self.notification_interval = interval;
        self
    }

    pub fn with_downtime_ceiling(mut self, ceiling: Duration) -> Self {
        self.downtime_ceiling = ceiling;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    /// Ids of running jobs are always remembered; this bounds finished ones.
    pub fn with_id_memory(mut self, ids: usize) -> Self {
        self.id_memory = ids.max(1);
        self
    }

    pub fn names(&self) -> QueueNames {
        QueueNames::from_root(self.queue_root.clone())
    }

    /// Identity fields stamped on every heartbeat
    pub(crate) fn heartbeat_identity(&self) -> HeartbeatBean {
        HeartbeatBean {
            beamline: self.beamline.clone(),
            consumer_name: Some(self.name.clone()),
            host_name: self.host_name.clone(),
            consumer_id: Some(self.consumer_id.clone()),
            ..HeartbeatBean::default()
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
