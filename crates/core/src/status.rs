// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status state machine shared by the consumer and external observers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a job bean.
///
/// ```text
/// SUBMITTED ─► QUEUED ─► RUNNING ─┬─► COMPLETE
///                                 ├─► FAILED
///                                 └─► TERMINATED
/// ```
///
/// `RequestTerminate` is a control status carried on the status topic. It is
/// not final; it asks the consumer owning the job to end it as `Terminated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Submitted,
    Queued,
    Running,
    RequestTerminate,
    Complete,
    Failed,
    Terminated,
}

impl Status {
    /// True for COMPLETE, FAILED and TERMINATED.
    pub fn is_final(self) -> bool {
        matches!(self, Status::Complete | Status::Failed | Status::Terminated)
    }

    /// True while a consumer owns the job.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Status::Queued | Status::Running | Status::RequestTerminate
        )
    }

    /// Check whether moving from `self` to `next` is allowed.
    ///
    /// Re-asserting the same final status is accepted; leaving a final status is not.
    pub fn check_transition(self, next: Status) -> Result<(), TransitionError> {
        if self.is_final() && self != next {
            return Err(TransitionError::FromFinal {
                from: self,
                to: next,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Submitted => "SUBMITTED",
            Status::Queued => "QUEUED",
            Status::Running => "RUNNING",
            Status::RequestTerminate => "REQUEST_TERMINATE",
            Status::Complete => "COMPLETE",
            Status::Failed => "FAILED",
            Status::Terminated => "TERMINATED",
        };
        write!(f, "{s}")
    }
}

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal transition {from} -> {to}: {from} is final")]
    FromFinal { from: Status, to: Status },
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
