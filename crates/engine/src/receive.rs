// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission receive loop
//!
//! Pulls one bean at a time off the submission queue and hands it to the
//! executor on its own task. Transport errors are retried every
//! notification interval while durable; once the accumulated downtime of one
//! outage passes the ceiling the broker is treated as gone for good.

use crate::connection::ConnectionManager;
use crate::executor::ProcessExecutor;
use crate::heartbeat::HeartbeatPublisher;
use bq_adapters::Broker;
use bq_core::{Clock, Connector, JobBean};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why the receive loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Cancelled by stop or disconnect
    Stopped,
    /// Transport error on a non-durable consumer
    NotDurable,
    /// Downtime passed the ceiling
    BrokerLost { downtime: Duration },
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub durable: bool,
    pub poll_timeout: Duration,
    pub notification_interval: Duration,
    pub downtime_ceiling: Duration,
}

pub struct ReceiveLoop<B: Broker, C, K> {
    connection: ConnectionManager<B>,
    connector: C,
    executor: Arc<ProcessExecutor<B, C>>,
    heartbeat: Arc<HeartbeatPublisher<B, C, K>>,
    settings: LoopSettings,
    cancel: CancellationToken,
}

impl<B: Broker, C: Connector, K: Clock> ReceiveLoop<B, C, K> {
    pub fn new(
        connection: ConnectionManager<B>,
        connector: C,
        executor: Arc<ProcessExecutor<B, C>>,
        heartbeat: Arc<HeartbeatPublisher<B, C, K>>,
        settings: LoopSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connection,
            connector,
            executor,
            heartbeat,
            settings,
            cancel,
        }
    }

    pub async fn run(mut self) -> LoopExit {
        let queue = self.connection.queue().to_string();
        tracing::info!(queue = %queue, durable = self.settings.durable, "receive loop started");
        let mut downtime = Duration::ZERO;

        let exit = loop {
            if self.cancel.is_cancelled() {
                break LoopExit::Stopped;
            }
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break LoopExit::Stopped,
                received = self.connection.receive(self.settings.poll_timeout) => received,
            };
            match received {
                Ok(None) => downtime = Duration::ZERO,
                Ok(Some(payload)) if self.cancel.is_cancelled() => {
                    self.give_back(&queue, payload).await;
                    break LoopExit::Stopped;
                }
                Ok(Some(payload)) => {
                    downtime = Duration::ZERO;
                    self.heartbeat.touch();
                    match self.connector.unmarshal::<JobBean>(&payload) {
                        Ok(bean) => self.dispatch(bean),
                        Err(e) => {
                            tracing::error!(queue = %queue, error = %e, "cannot decode bean, skipping")
                        }
                    }
                }
                Err(e) => {
                    if !self.settings.durable {
                        tracing::warn!(queue = %queue, error = %e, "broker error on non-durable consumer, stopping");
                        break LoopExit::NotDurable;
                    }
                    let interval = self.settings.notification_interval;
                    tracing::warn!(
                        queue = %queue,
                        error = %e,
                        downtime_ms = downtime.as_millis() as u64,
                        retry_ms = interval.as_millis() as u64,
                        "broker connection lost, will retry"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => break LoopExit::Stopped,
                        _ = tokio::time::sleep(interval) => {}
                    }
                    downtime += interval;
                    if downtime > self.settings.downtime_ceiling {
                        tracing::error!(
                            queue = %queue,
                            downtime_s = downtime.as_secs(),
                            "broker permanently lost, consumer shutting down"
                        );
                        break LoopExit::BrokerLost { downtime };
                    }
                }
            }
        };

        self.connection.close().await;
        tracing::info!(queue = %queue, exit = ?exit, "receive loop ended");
        exit
    }

    async fn give_back(&self, queue: &str, payload: String) {
        match self.connection.requeue(payload).await {
            Ok(()) => tracing::info!(queue = %queue, "stopped while receiving, bean returned to queue"),
            Err(e) => tracing::error!(queue = %queue, error = %e, "stopped while receiving, bean lost"),
        }
    }

    /// Reserve the id now, run the job on its own task.
    fn dispatch(&self, bean: JobBean) {
        if let Err(e) = self.executor.admit(&bean) {
            tracing::error!(job_id = %bean.unique_id, error = %e, "rejecting submission");
            return;
        }
        tracing::info!(job_id = %bean.unique_id, name = %bean.name, "received");
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            let id = bean.unique_id.clone();
            if let Err(e) = executor.run(bean).await {
                tracing::error!(job_id = %id, error = %e, "job did not complete");
            }
        });
    }
}

#[cfg(test)]
#[path = "receive_tests.rs"]
mod tests;
