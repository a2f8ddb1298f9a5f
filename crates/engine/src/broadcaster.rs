// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status broadcaster
//!
//! Every job update goes to the status topic for live observers and into the
//! status set so late joiners can see the latest state per job.

use async_trait::async_trait;
use bq_adapters::{Broker, BrokerError};
use bq_core::{CodecError, Connector, JobBean, JobId};
use indexmap::IndexSet;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::DEFAULT_ID_MEMORY;
use crate::error::ErrorKind;

/// Errors from publishing a job update
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("job {0} already reached a final status, update rejected")]
    AlreadyFinal(JobId),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transport(#[from] BrokerError),
}

impl BroadcastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BroadcastError::AlreadyFinal(_) => ErrorKind::Lifecycle,
            BroadcastError::Codec(_) => ErrorKind::Deserialization,
            BroadcastError::Transport(_) => ErrorKind::Transport,
        }
    }
}

/// Publishing side handed to every process
#[async_trait]
pub trait Broadcast: Send + Sync {
    async fn broadcast(&self, bean: &JobBean) -> Result<(), BroadcastError>;
}

pub struct StatusBroadcaster<B, C> {
    broker: B,
    connector: C,
    topic: String,
    set: String,
    /// Ids already broadcast in a final status, oldest first. Held across
    /// the publish so updates leave in the order they were issued.
    finals: Mutex<IndexSet<JobId>>,
    finals_capacity: usize,
}

impl<B: Broker, C: Connector> StatusBroadcaster<B, C> {
    pub fn new(broker: B, connector: C, topic: impl Into<String>, set: impl Into<String>) -> Self {
        Self {
            broker,
            connector,
            topic: topic.into(),
            set: set.into(),
            finals: Mutex::new(IndexSet::new()),
            finals_capacity: DEFAULT_ID_MEMORY,
        }
    }

    /// How many finished ids to remember. The oldest are forgotten first.
    pub fn with_finals_capacity(mut self, capacity: usize) -> Self {
        self.finals_capacity = capacity.max(1);
        self
    }

    /// Store the bean in the status set without notifying observers.
    pub async fn record_submission(&self, bean: &JobBean) -> Result<(), BroadcastError> {
        let _order = self.finals.lock().await;
        let payload = self.connector.marshal(bean)?;
        self.broker
            .upsert(&self.set, bean.unique_id.as_str(), payload)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<B: Broker, C: Connector> Broadcast for StatusBroadcaster<B, C> {
    async fn broadcast(&self, bean: &JobBean) -> Result<(), BroadcastError> {
        let mut finals = self.finals.lock().await;
        if finals.contains(&bean.unique_id) {
            tracing::error!(
                job_id = %bean.unique_id,
                status = %bean.status(),
                "update after final status rejected"
            );
            return Err(BroadcastError::AlreadyFinal(bean.unique_id.clone()));
        }

        let payload = self.connector.marshal(bean)?;
        self.broker.publish(&self.topic, payload.clone()).await?;
        self.broker
            .upsert(&self.set, bean.unique_id.as_str(), payload)
            .await?;
        tracing::debug!(
            job_id = %bean.unique_id,
            status = %bean.status(),
            percent = bean.percent_complete(),
            "status broadcast"
        );

        if bean.is_final() {
            finals.insert(bean.unique_id.clone());
            while finals.len() > self.finals_capacity {
                finals.shift_remove_index(0);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
