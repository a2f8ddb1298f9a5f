// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness beacon and consumer kill command.

use crate::id::ConsumerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run state reported in a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerStatus {
    Running,
    Stopped,
    Error,
}

impl fmt::Display for ConsumerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerStatus::Running => write!(f, "RUNNING"),
            ConsumerStatus::Stopped => write!(f, "STOPPED"),
            ConsumerStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Periodic liveness beacon identifying one consumer instance.
///
/// Equality is structural over every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatBean {
    #[serde(default)]
    pub beamline: Option<String>,
    /// Epoch ms the beat was emitted
    #[serde(default)]
    pub publish_time: u64,
    /// Epoch ms the publisher started; `None` when unknown
    #[serde(default)]
    pub conception_time: Option<u64>,
    /// Epoch ms of the most recent observed activity
    #[serde(default)]
    pub last_alive: u64,
    #[serde(default)]
    pub consumer_name: Option<String>,
    #[serde(default)]
    pub consumer_id: Option<ConsumerId>,
    #[serde(default)]
    pub consumer_status: Option<ConsumerStatus>,
    #[serde(default)]
    pub host_name: Option<String>,
}

impl HeartbeatBean {
    /// No beat recorded.
    pub const EMPTY: HeartbeatBean = HeartbeatBean {
        beamline: None,
        publish_time: 0,
        conception_time: None,
        last_alive: 0,
        consumer_name: None,
        consumer_id: None,
        consumer_status: None,
        host_name: None,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Command asking a specific consumer to stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillBean {
    pub consumer_id: ConsumerId,
    /// Also tear down the broker connection
    #[serde(default)]
    pub disconnect: bool,
    /// Terminate the host process after the grace delay
    #[serde(default)]
    pub exit_process: bool,
}

impl KillBean {
    pub fn new(consumer_id: ConsumerId) -> Self {
        Self {
            consumer_id,
            disconnect: false,
            exit_process: false,
        }
    }

    pub fn with_disconnect(mut self, disconnect: bool) -> Self {
        self.disconnect = disconnect;
        self
    }

    pub fn with_exit_process(mut self, exit_process: bool) -> Self {
        self.exit_process = exit_process;
        self
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
