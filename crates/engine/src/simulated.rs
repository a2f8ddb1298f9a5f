// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulated process: steps progress on a timer until done or terminated
//!
//! The daemon runs this when no real processor is plugged in, which is enough
//! to exercise a deployment end to end.

use crate::broadcaster::Broadcast;
use crate::process::{ConsumerProcess, ProcessError, ProcessFactory};
use async_trait::async_trait;
use bq_core::{Clock, JobBean, Status};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct SimulatedProcess<K: Clock> {
    bean: Mutex<JobBean>,
    publisher: Arc<dyn Broadcast>,
    clock: K,
    steps: u32,
    step_interval: Duration,
    terminate: CancellationToken,
}

impl<K: Clock> SimulatedProcess<K> {
    pub fn new(
        bean: JobBean,
        publisher: Arc<dyn Broadcast>,
        clock: K,
        steps: u32,
        step_interval: Duration,
    ) -> Self {
        Self {
            bean: Mutex::new(bean),
            publisher,
            clock,
            steps: steps.max(1),
            step_interval,
            terminate: CancellationToken::new(),
        }
    }

    /// Apply `update` and broadcast the result.
    async fn publish(
        &self,
        update: impl FnOnce(&mut JobBean) -> Result<(), ProcessError>,
    ) -> Result<(), ProcessError> {
        let snapshot = {
            let mut bean = self.bean.lock();
            update(&mut bean)?;
            bean.clone()
        };
        self.publisher.broadcast(&snapshot).await?;
        Ok(())
    }

    async fn finish(&self, status: Status, message: &str) -> Result<(), ProcessError> {
        let now = self.clock.epoch_ms();
        self.publish(|bean| {
            bean.set_status(status)?;
            if status == Status::Complete {
                bean.set_percent_complete(100.0);
            }
            bean.set_message(message);
            bean.mark_finished(now);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl<K: Clock> ConsumerProcess for SimulatedProcess<K> {
    fn bean(&self) -> JobBean {
        self.bean.lock().clone()
    }

    async fn execute(&self) -> Result<(), ProcessError> {
        let now = self.clock.epoch_ms();
        self.publish(|bean| {
            bean.set_status(Status::Running)?;
            bean.reset_progress();
            bean.mark_started(now);
            Ok(())
        })
        .await?;

        for step in 1..=self.steps {
            tokio::select! {
                _ = self.terminate.cancelled() => {
                    tracing::info!(job_id = %self.bean.lock().unique_id, step, "terminated");
                    return self.finish(Status::Terminated, "Terminated on request").await;
                }
                _ = tokio::time::sleep(self.step_interval) => {}
            }
            let percent = f64::from(step) * 100.0 / f64::from(self.steps);
            self.publish(|bean| {
                bean.set_percent_complete(percent);
                Ok(())
            })
            .await?;
        }

        self.finish(Status::Complete, "Complete").await
    }

    async fn terminate(&self) -> Result<(), ProcessError> {
        self.terminate.cancel();
        Ok(())
    }
}

/// Factory for [`SimulatedProcess`]
#[derive(Clone)]
pub struct SimulatedFactory<K: Clock> {
    clock: K,
    steps: u32,
    step_interval: Duration,
}

impl<K: Clock> SimulatedFactory<K> {
    pub fn new(clock: K, steps: u32, step_interval: Duration) -> Self {
        Self {
            clock,
            steps,
            step_interval,
        }
    }
}

impl<K: Clock> ProcessFactory for SimulatedFactory<K> {
    fn create(
        &self,
        bean: JobBean,
        publisher: Arc<dyn Broadcast>,
    ) -> Result<Arc<dyn ConsumerProcess>, ProcessError> {
        Ok(Arc::new(SimulatedProcess::new(
            bean,
            publisher,
            self.clock.clone(),
            self.steps,
            self.step_interval,
        )))
    }
}

#[cfg(test)]
#[path = "simulated_tests.rs"]
mod tests;
