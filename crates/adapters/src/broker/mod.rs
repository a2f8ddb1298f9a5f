// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker adapters
//!
//! A broker offers three kinds of destination:
//! - queues: point-to-point, each payload is received by exactly one receiver
//! - topics: publish/subscribe, every live subscription sees every payload in order
//! - sets: durable key → latest payload maps
//!
//! Payloads are opaque text; marshalling happens above this layer.

mod memory;
mod spool;

pub use memory::{MemoryBroker, MemoryReceiver};
pub use spool::{SpoolBroker, SpoolReceiver};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BrokerCall, FakeBroker, FakeReceiver};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from broker operations.
///
/// Every variant is a transport failure: the caller should discard any
/// receive handle it holds and retry on a fresh one.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unreachable: {0}")]
    Unreachable(String),
    #[error("broker I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("broker connection closed")]
    Closed,
    #[error("invalid broker uri: {0}")]
    InvalidUri(String),
}

/// Receive side of one queue.
#[async_trait]
pub trait QueueReceiver: Send + Sync + 'static {
    /// Wait up to `timeout` for one payload. `Ok(None)` means nothing arrived.
    ///
    /// Cancel safe: dropping the future before it completes consumes nothing.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError>;

    /// Release the handle. Later receives fail with [`BrokerError::Closed`].
    async fn close(&mut self);
}

/// Ordered stream of payloads published to one topic.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            topic: topic.into(),
            rx,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next payload, or `None` once the broker side has gone away.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Adapter for a message broker
#[async_trait]
pub trait Broker: Clone + Send + Sync + 'static {
    type Receiver: QueueReceiver;

    /// Open a receive handle on a queue
    async fn open_receiver(&self, queue: &str) -> Result<Self::Receiver, BrokerError>;

    /// Append a payload to a queue
    async fn submit(&self, queue: &str, payload: String) -> Result<(), BrokerError>;

    /// Publish a payload to every subscriber of a topic
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BrokerError>;

    /// Subscribe to payloads published after this call
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError>;

    /// Insert or replace the payload stored under `key` in a set
    async fn upsert(&self, set: &str, key: &str, payload: String) -> Result<(), BrokerError>;

    /// All payloads in a set
    async fn set_entries(&self, set: &str) -> Result<Vec<String>, BrokerError>;

    /// Browse pending payloads in a queue without consuming them
    async fn queue_entries(&self, queue: &str) -> Result<Vec<String>, BrokerError>;

    /// Empty a queue or set
    async fn clear(&self, name: &str) -> Result<(), BrokerError>;

    /// Release connection resources held by this handle.
    /// Default implementation is a no-op.
    async fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}
