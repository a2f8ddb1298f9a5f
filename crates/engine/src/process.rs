// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable job processes

use crate::broadcaster::{Broadcast, BroadcastError};
use async_trait::async_trait;
use bq_core::{JobBean, TransitionError};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// One running job.
///
/// `execute` and `terminate` may be called concurrently: termination is a
/// request the process honours at its next checkpoint, after which it
/// broadcasts TERMINATED and `execute` returns.
#[async_trait]
pub trait ConsumerProcess: Send + Sync {
    /// Snapshot of the job as the process currently sees it
    fn bean(&self) -> JobBean;

    async fn execute(&self) -> Result<(), ProcessError>;

    async fn terminate(&self) -> Result<(), ProcessError>;
}

/// Builds a process for each received bean
pub trait ProcessFactory: Send + Sync + 'static {
    fn create(
        &self,
        bean: JobBean,
        publisher: Arc<dyn Broadcast>,
    ) -> Result<Arc<dyn ConsumerProcess>, ProcessError>;
}

impl<F> ProcessFactory for F
where
    F: Fn(JobBean, Arc<dyn Broadcast>) -> Result<Arc<dyn ConsumerProcess>, ProcessError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        bean: JobBean,
        publisher: Arc<dyn Broadcast>,
    ) -> Result<Arc<dyn ConsumerProcess>, ProcessError> {
        self(bean, publisher)
    }
}
