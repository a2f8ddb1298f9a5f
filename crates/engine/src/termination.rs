// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Termination listener: acts on REQUEST_TERMINATE beans from the status topic

use crate::registry::ProcessRegistry;
use bq_adapters::Subscription;
use bq_core::{Connector, JobBean, Status};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct TerminationListener<C> {
    registry: Arc<ProcessRegistry>,
    connector: C,
}

impl<C: Connector> TerminationListener<C> {
    pub fn new(registry: Arc<ProcessRegistry>, connector: C) -> Self {
        Self {
            registry,
            connector,
        }
    }

    /// Handle one status-topic payload. Returns true if a process was asked to terminate.
    pub async fn handle(&self, payload: &str) -> bool {
        let bean: JobBean = match self.connector.unmarshal(payload) {
            Ok(bean) => bean,
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable status update");
                return false;
            }
        };
        if bean.status() != Status::RequestTerminate {
            return false;
        }

        let Some(process) = self.registry.get(bean.unique_id.as_str()) else {
            tracing::debug!(job_id = %bean.unique_id, "terminate request for a job not running here");
            return false;
        };
        tracing::info!(job_id = %bean.unique_id, "terminate requested");
        if let Err(e) = process.terminate().await {
            tracing::error!(job_id = %bean.unique_id, error = %e, "cannot terminate process");
        }
        true
    }

    pub async fn run(self, mut subscription: Subscription, cancel: CancellationToken) {
        loop {
            let payload = tokio::select! {
                _ = cancel.cancelled() => break,
                payload = subscription.recv() => payload,
            };
            match payload {
                Some(payload) => {
                    self.handle(&payload).await;
                }
                None => {
                    tracing::warn!(topic = subscription.topic(), "status subscription ended");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "termination_tests.rs"]
mod tests;
