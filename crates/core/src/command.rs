// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative commands carried on the command topic.

use crate::heartbeat::ConsumerStatus;
use crate::id::{ConsumerId, JobId};
use crate::Identified;
use serde::{Deserialize, Serialize};

/// What the requester wants from a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerCommand {
    /// Reply with identity only
    Ping,
    /// Reply with identity, run state and active jobs
    Status,
}

/// A consumer's answer to a [`CommandBean`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReply {
    pub consumer_id: ConsumerId,
    pub consumer_name: String,
    pub consumer_status: ConsumerStatus,
    #[serde(default)]
    pub active_jobs: Vec<JobId>,
}

/// Request/response bean for the administrative channel.
///
/// Requests travel on the command topic with `reply == None`; each
/// consumer answers on the command response topic with the same
/// `unique_id` and `reply` filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBean {
    pub unique_id: String,
    /// Addressed consumer; `None` asks every consumer listening
    #[serde(default)]
    pub consumer_id: Option<ConsumerId>,
    pub command: ConsumerCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<CommandReply>,
}

impl CommandBean {
    pub fn new(command: ConsumerCommand) -> Self {
        Self {
            unique_id: uuid::Uuid::new_v4().to_string(),
            consumer_id: None,
            command,
            reply: None,
        }
    }

    pub fn addressed_to(mut self, consumer_id: ConsumerId) -> Self {
        self.consumer_id = Some(consumer_id);
        self
    }

    /// True when this request should be answered by `consumer_id`.
    pub fn is_for(&self, consumer_id: &ConsumerId) -> bool {
        self.consumer_id.as_ref().map_or(true, |id| id == consumer_id)
    }
}

impl Identified for CommandBean {
    fn identity(&self) -> &str {
        &self.unique_id
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
