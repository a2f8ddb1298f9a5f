// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced broker wrapper for consistent observability

use crate::broker::{Broker, BrokerError, QueueReceiver, Subscription};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any Broker
#[derive(Clone)]
pub struct TracedBroker<B> {
    inner: B,
}

impl<B> TracedBroker<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

/// Wrapper that logs receive failures on any QueueReceiver
pub struct TracedReceiver<R> {
    queue: String,
    inner: R,
}

#[async_trait]
impl<R: QueueReceiver> QueueReceiver for TracedReceiver<R> {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        let result = self.inner.receive(timeout).await;
        match &result {
            Ok(Some(payload)) => {
                tracing::debug!(queue = %self.queue, payload_len = payload.len(), "received")
            }
            Ok(None) => tracing::trace!(queue = %self.queue, "receive timed out"),
            Err(e) => tracing::warn!(queue = %self.queue, error = %e, "receive failed"),
        }
        result
    }

    async fn close(&mut self) {
        tracing::debug!(queue = %self.queue, "closing receiver");
        self.inner.close().await;
    }
}

#[async_trait]
impl<B: Broker> Broker for TracedBroker<B> {
    type Receiver = TracedReceiver<B::Receiver>;

    async fn open_receiver(&self, queue: &str) -> Result<Self::Receiver, BrokerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.open_receiver(queue).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "receiver opened"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "open failed"),
            }
            result.map(|inner| TracedReceiver {
                queue: queue.to_string(),
                inner,
            })
        }
        .instrument(tracing::info_span!("broker.open_receiver", queue))
        .await
    }

    async fn submit(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        tracing::info_span!("broker.submit", queue)
            .in_scope(|| tracing::debug!(payload_len = payload.len(), "submitting"));
        let result = self.inner.submit(queue, payload).await;
        if let Err(ref e) = result {
            tracing::error!(queue, error = %e, "submit failed");
        }
        result
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BrokerError> {
        tracing::info_span!("broker.publish", topic)
            .in_scope(|| tracing::debug!(payload_len = payload.len(), "publishing"));
        let result = self.inner.publish(topic, payload).await;
        if let Err(ref e) = result {
            tracing::error!(topic, error = %e, "publish failed");
        }
        result
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        let result = self.inner.subscribe(topic).await;
        tracing::info_span!("broker.subscribe", topic).in_scope(|| match &result {
            Ok(_) => tracing::info!("subscribed"),
            Err(e) => tracing::error!(error = %e, "subscribe failed"),
        });
        result
    }

    async fn upsert(&self, set: &str, key: &str, payload: String) -> Result<(), BrokerError> {
        let result = self.inner.upsert(set, key, payload).await;
        if let Err(ref e) = result {
            tracing::error!(set, key, error = %e, "upsert failed");
        }
        result
    }

    async fn set_entries(&self, set: &str) -> Result<Vec<String>, BrokerError> {
        let result = self.inner.set_entries(set).await;
        tracing::trace!(set, count = ?result.as_ref().map(Vec::len).ok(), "browsed set");
        result
    }

    async fn queue_entries(&self, queue: &str) -> Result<Vec<String>, BrokerError> {
        let result = self.inner.queue_entries(queue).await;
        tracing::trace!(queue, count = ?result.as_ref().map(Vec::len).ok(), "browsed queue");
        result
    }

    async fn clear(&self, name: &str) -> Result<(), BrokerError> {
        let result = self.inner.clear(name).await;
        tracing::info_span!("broker.clear", name).in_scope(|| match &result {
            Ok(()) => tracing::info!("cleared"),
            Err(e) => tracing::warn!(error = %e, "clear failed"),
        });
        result
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let result = self.inner.close().await;
        match &result {
            Ok(()) => tracing::info!("broker connection closed"),
            Err(e) => tracing::warn!(error = %e, "broker close failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
