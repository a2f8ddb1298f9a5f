// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker destination names derived from one queue root.

pub const SUBMISSION_QUEUE_SUFFIX: &str = ".submission.queue";
pub const STATUS_SET_SUFFIX: &str = ".status.set";
pub const STATUS_TOPIC_SUFFIX: &str = ".status.topic";
pub const HEARTBEAT_TOPIC_SUFFIX: &str = ".heartbeat.topic";
pub const COMMAND_SET_SUFFIX: &str = ".command.set";
pub const COMMAND_TOPIC_SUFFIX: &str = ".command.topic";
pub const COMMAND_RESPONSE_TOPIC_SUFFIX: &str = ".command.response.topic";
pub const KILL_TOPIC_SUFFIX: &str = ".kill.topic";

/// Every destination a consumer touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    pub root: String,
    /// Point-to-point queue of pending job beans
    pub submission_queue: String,
    /// Latest state per job
    pub status_set: String,
    /// Job bean updates, including REQUEST_TERMINATE control beans
    pub status_topic: String,
    pub heartbeat_topic: String,
    pub command_set: String,
    pub command_topic: String,
    pub command_response_topic: String,
    pub kill_topic: String,
}

impl QueueNames {
    pub fn from_root(root: impl Into<String>) -> Self {
        let root = root.into();
        let with = |suffix: &str| format!("{root}{suffix}");
        Self {
            submission_queue: with(SUBMISSION_QUEUE_SUFFIX),
            status_set: with(STATUS_SET_SUFFIX),
            status_topic: with(STATUS_TOPIC_SUFFIX),
            heartbeat_topic: with(HEARTBEAT_TOPIC_SUFFIX),
            command_set: with(COMMAND_SET_SUFFIX),
            command_topic: with(COMMAND_TOPIC_SUFFIX),
            command_response_topic: with(COMMAND_RESPONSE_TOPIC_SUFFIX),
            kill_topic: with(KILL_TOPIC_SUFFIX),
            root,
        }
    }
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod tests;
