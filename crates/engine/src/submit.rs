// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of a consumer: submit jobs, ask for termination, send kills

use crate::error::ConsumerError;
use bq_adapters::Broker;
use bq_core::{Clock, Connector, IdGen, JobBean, KillBean, QueueNames, Status, UuidIdGen};

pub struct Submitter<B, C, K, G = UuidIdGen> {
    broker: B,
    connector: C,
    clock: K,
    id_gen: G,
    names: QueueNames,
}

impl<B: Broker, C: Connector, K: Clock> Submitter<B, C, K> {
    pub fn new(broker: B, connector: C, clock: K, queue_root: impl Into<String>) -> Self {
        Self {
            broker,
            connector,
            clock,
            id_gen: UuidIdGen,
            names: QueueNames::from_root(queue_root),
        }
    }
}

impl<B: Broker, C: Connector, K: Clock, G: IdGen> Submitter<B, C, K, G> {
    pub fn with_id_gen<G2: IdGen>(self, id_gen: G2) -> Submitter<B, C, K, G2> {
        Submitter {
            broker: self.broker,
            connector: self.connector,
            clock: self.clock,
            id_gen,
            names: self.names,
        }
    }

    pub fn names(&self) -> &QueueNames {
        &self.names
    }

    /// A SUBMITTED bean with an id from this submitter's generator
    pub fn create(&self, name: impl Into<String>) -> JobBean {
        JobBean::with_id(self.id_gen.next(), name)
    }

    /// Queue a bean for execution, stamping its submission time if unset.
    pub async fn submit(&self, mut bean: JobBean) -> Result<JobBean, ConsumerError> {
        if bean.is_final() {
            return Err(ConsumerError::AlreadyFinal(bean.unique_id));
        }
        if bean.submission_time == 0 {
            bean.submission_time = self.clock.epoch_ms();
        }
        let payload = self.connector.marshal(&bean)?;
        self.broker.submit(&self.names.submission_queue, payload).await?;
        tracing::info!(job_id = %bean.unique_id, queue = %self.names.submission_queue, "submitted");
        Ok(bean)
    }

    /// Ask whichever consumer runs `bean` to terminate it.
    pub async fn request_terminate(&self, bean: &JobBean) -> Result<(), ConsumerError> {
        let mut request = bean.clone();
        request.set_status(Status::RequestTerminate)?;
        let payload = self.connector.marshal(&request)?;
        self.broker.publish(&self.names.status_topic, payload).await?;
        tracing::info!(job_id = %bean.unique_id, "terminate requested");
        Ok(())
    }

    pub async fn kill(&self, kill: &KillBean) -> Result<(), ConsumerError> {
        let payload = self.connector.marshal(kill)?;
        self.broker.publish(&self.names.kill_topic, payload).await?;
        tracing::warn!(consumer_id = %kill.consumer_id, exit = kill.exit_process, "kill sent");
        Ok(())
    }
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
