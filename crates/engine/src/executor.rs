// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process executor: turns a received bean into a running process

use crate::broadcaster::{Broadcast, StatusBroadcaster};
use crate::error::ConsumerError;
use crate::process::{ConsumerProcess, ProcessError, ProcessFactory};
use crate::registry::ProcessRegistry;
use bq_adapters::Broker;
use bq_core::{Connector, JobBean, Status};
use std::sync::Arc;

pub struct ProcessExecutor<B, C> {
    broadcaster: Arc<StatusBroadcaster<B, C>>,
    registry: Arc<ProcessRegistry>,
    factory: Option<Arc<dyn ProcessFactory>>,
}

impl<B: Broker, C: Connector> ProcessExecutor<B, C> {
    pub fn new(
        broadcaster: Arc<StatusBroadcaster<B, C>>,
        registry: Arc<ProcessRegistry>,
        factory: Option<Arc<dyn ProcessFactory>>,
    ) -> Self {
        Self {
            broadcaster,
            registry,
            factory,
        }
    }

    /// Reserve the bean's id. Synchronous so back-to-back duplicates are
    /// caught before either job starts.
    pub fn admit(&self, bean: &JobBean) -> Result<(), ConsumerError> {
        self.registry.reserve(&bean.unique_id)
    }

    /// Admit and run a bean to completion.
    pub async fn execute(&self, bean: JobBean) -> Result<(), ConsumerError> {
        self.admit(&bean)?;
        self.run(bean).await
    }

    /// Run an admitted bean.
    pub async fn run(&self, mut bean: JobBean) -> Result<(), ConsumerError> {
        let id = bean.unique_id.clone();
        if bean.is_final() {
            return Err(ConsumerError::AlreadyFinal(id));
        }
        if bean.status() == Status::Submitted {
            bean.set_status(Status::Queued)?;
        }
        // Observers see the job even if its process dies immediately
        self.broadcaster.record_submission(&bean).await?;
        if self.registry.is_closed() {
            return self.abandon(bean).await;
        }

        let Some(factory) = self.factory.as_ref() else {
            let message = "No runner set for consumer, nothing run".to_string();
            return self.fail(bean, message, ConsumerError::MissingRunner).await;
        };

        let publisher: Arc<dyn Broadcast> = Arc::clone(&self.broadcaster) as Arc<dyn Broadcast>;
        let process = match factory.create(bean.clone(), publisher) {
            Ok(process) => process,
            Err(e) => {
                let message = format!("Cannot create process: {e}");
                return self
                    .fail(bean, message, ConsumerError::Process { id, source: e })
                    .await;
            }
        };

        if !self.registry.register(&id, &process) {
            return self.abandon(process.bean()).await;
        }
        tracing::info!(job_id = %id, name = %bean.name, "executing");
        let result = process.execute().await;
        let outcome = self.settle(&process, result).await;

        if outcome.is_err() || process.bean().is_final() {
            self.registry.deregister(id.as_str());
        }
        outcome
    }

    /// Make sure a failed execution leaves a FAILED bean behind.
    async fn settle(
        &self,
        process: &Arc<dyn ConsumerProcess>,
        result: Result<(), ProcessError>,
    ) -> Result<(), ConsumerError> {
        let bean = process.bean();
        match result {
            Ok(()) => {
                tracing::info!(job_id = %bean.unique_id, status = %bean.status(), "process returned");
                Ok(())
            }
            Err(e) => {
                let id = bean.unique_id.clone();
                if bean.is_final() {
                    tracing::error!(job_id = %id, error = %e, "process failed after final status");
                    return Err(ConsumerError::Process { id, source: e });
                }
                let message = e.to_string();
                self.fail(bean, message, ConsumerError::Process { id, source: e })
                    .await
            }
        }
    }

    /// End a job the stopped consumer will never run.
    async fn abandon(&self, mut bean: JobBean) -> Result<(), ConsumerError> {
        let id = bean.unique_id.clone();
        tracing::warn!(job_id = %id, "consumer stopping, job not run");
        bean.set_status(Status::Terminated)?;
        bean.set_message("Consumer stopped before the job could run");
        if let Err(e) = self.broadcaster.broadcast(&bean).await {
            tracing::error!(job_id = %id, error = %e, "cannot broadcast termination");
        }
        Err(ConsumerError::Closed(id))
    }

    async fn fail(
        &self,
        mut bean: JobBean,
        message: String,
        error: ConsumerError,
    ) -> Result<(), ConsumerError> {
        tracing::error!(job_id = %bean.unique_id, error = %error, "job failed");
        if let Err(e) = bean.fail(message) {
            tracing::error!(job_id = %bean.unique_id, error = %e, "cannot mark job failed");
        } else if let Err(e) = self.broadcaster.broadcast(&bean).await {
            tracing::error!(job_id = %bean.unique_id, error = %e, "cannot broadcast failure");
        }
        Err(error)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
