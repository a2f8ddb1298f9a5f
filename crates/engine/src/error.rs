// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the consumer engine

use crate::broadcaster::BroadcastError;
use crate::process::ProcessError;
use bq_adapters::BrokerError;
use bq_core::{CodecError, JobId, TransitionError};
use std::time::Duration;
use thiserror::Error;

/// How the consumer reacts to a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Broker connectivity; retried with a fixed backoff
    Transport,
    /// Malformed payload; the message is skipped
    Deserialization,
    /// Identifier already used on this consumer
    Duplicate,
    /// No process factory configured
    MissingRunner,
    /// Unrecoverable; the consumer deactivates
    Fatal,
    /// The job's own process failed
    Process,
    /// No reply within the response window
    Timeout,
    /// Operation not allowed in the current lifecycle state
    Lifecycle,
}

/// Errors that can occur in the consumer
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
    #[error("job {0} has already been used on this consumer, cannot run the same id twice")]
    Duplicate(JobId),
    #[error("no process factory set, nothing can run")]
    MissingRunner,
    #[error("broker lost for {}s, giving up", .downtime.as_secs())]
    BrokerLost { downtime: Duration },
    #[error("job {id} failed: {source}")]
    Process {
        id: JobId,
        #[source]
        source: ProcessError,
    },
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("invalid status transition: {0}")]
    Transition(#[from] TransitionError),
    #[error("runner cannot be changed once the consumer has started")]
    RunnerLocked,
    #[error("consumer already started")]
    AlreadyStarted,
    #[error("consumer has been stopped and cannot restart")]
    Stopped,
    #[error("job {0} arrived while the consumer was stopping, not run")]
    Closed(JobId),
    #[error("job {0} was submitted in a final status")]
    AlreadyFinal(JobId),
}

impl ConsumerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsumerError::Broker(_) => ErrorKind::Transport,
            ConsumerError::Codec(_) => ErrorKind::Deserialization,
            ConsumerError::Broadcast(e) => e.kind(),
            ConsumerError::Duplicate(_) => ErrorKind::Duplicate,
            ConsumerError::MissingRunner => ErrorKind::MissingRunner,
            ConsumerError::BrokerLost { .. } => ErrorKind::Fatal,
            ConsumerError::Process { .. } => ErrorKind::Process,
            ConsumerError::Timeout(_) => ErrorKind::Timeout,
            ConsumerError::Transition(_)
            | ConsumerError::RunnerLocked
            | ConsumerError::AlreadyStarted
            | ConsumerError::Stopped
            | ConsumerError::Closed(_)
            | ConsumerError::AlreadyFinal(_) => ErrorKind::Lifecycle,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
