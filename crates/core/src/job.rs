// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job bean: the work item pulled off the submission queue.

use crate::id::JobId;
use crate::status::{Status, TransitionError};
use serde::{Deserialize, Serialize};

/// Work-item descriptor exchanged over the broker.
///
/// Status and progress are only changed through [`JobBean::set_status`] and
/// [`JobBean::set_percent_complete`] so the state machine invariants hold for
/// every owner of the bean. Provenance fields are never rewritten by the
/// consumer; they travel verbatim from submission to the final status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobBean {
    pub unique_id: JobId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_status: Option<Status>,
    #[serde(default)]
    percent_complete: f64,
    /// Latest diagnostic text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beamline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Epoch ms when the bean was submitted (0 if unknown)
    #[serde(default)]
    pub submission_time: u64,
    /// Epoch ms when execution started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    /// Elapsed execution time in ms, set when the job finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<u64>,
}

impl JobBean {
    /// Create a SUBMITTED bean with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(JobId::random(), name)
    }

    pub fn with_id(id: impl Into<JobId>, name: impl Into<String>) -> Self {
        Self {
            unique_id: id.into(),
            name: name.into(),
            status: Status::Submitted,
            previous_status: None,
            percent_complete: 0.0,
            message: None,
            beamline: None,
            host_name: None,
            user_name: None,
            submission_time: 0,
            start_time: None,
            run_time: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn previous_status(&self) -> Option<Status> {
        self.previous_status
    }

    pub fn percent_complete(&self) -> f64 {
        self.percent_complete
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }

    /// Move to `next`, remembering the current status as the previous one.
    pub fn set_status(&mut self, next: Status) -> Result<(), TransitionError> {
        self.status.check_transition(next)?;
        if self.status.is_final() {
            return Ok(());
        }
        self.previous_status = Some(self.status);
        self.status = next;
        Ok(())
    }

    /// Record progress, clamped to `0..=100`.
    ///
    /// While RUNNING, progress never goes backwards: a lower value is ignored
    /// and `false` is returned. Use [`JobBean::reset_progress`] to restart.
    pub fn set_percent_complete(&mut self, percent: f64) -> bool {
        if !percent.is_finite() {
            return false;
        }
        let percent = percent.clamp(0.0, 100.0);
        if self.status == Status::Running && percent < self.percent_complete {
            return false;
        }
        self.percent_complete = percent;
        true
    }

    pub fn reset_progress(&mut self) {
        self.percent_complete = 0.0;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Transition to FAILED with a diagnostic message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.set_status(Status::Failed)?;
        self.set_message(message);
        Ok(())
    }

    /// Stamp the start of execution.
    pub fn mark_started(&mut self, epoch_ms: u64) {
        self.start_time = Some(epoch_ms);
    }

    /// Stamp the run time from the recorded start.
    pub fn mark_finished(&mut self, epoch_ms: u64) {
        if let Some(start) = self.start_time {
            self.run_time = Some(epoch_ms.saturating_sub(start));
        }
    }
}

impl crate::Identified for JobBean {
    fn identity(&self) -> &str {
        self.unique_id.as_str()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
