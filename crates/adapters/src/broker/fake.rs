// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake broker for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Broker, BrokerError, MemoryBroker, MemoryReceiver, QueueReceiver, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Recorded broker call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    OpenReceiver { queue: String },
    Submit { queue: String, payload: String },
    Publish { topic: String, payload: String },
    Subscribe { topic: String },
    Upsert { set: String, key: String, payload: String },
    Clear { name: String },
    Close,
}

struct FakeBrokerState {
    reachable: bool,
    failing_receives: usize,
    failing_subscriptions: HashSet<String>,
    upsert_delay: Duration,
    calls: Vec<BrokerCall>,
}

impl FakeBrokerState {
    fn check(&self) -> Result<(), BrokerError> {
        if self.reachable {
            Ok(())
        } else {
            Err(BrokerError::Unreachable("fake broker is down".to_string()))
        }
    }
}

/// Fake broker for testing
///
/// Delivers through an in-memory broker while recording every call, and
/// can be switched to unreachable to exercise the reconnect paths.
#[derive(Clone)]
pub struct FakeBroker {
    memory: MemoryBroker,
    inner: Arc<Mutex<FakeBrokerState>>,
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self {
            memory: MemoryBroker::new(),
            inner: Arc::new(Mutex::new(FakeBrokerState {
                reachable: true,
                failing_receives: 0,
                failing_subscriptions: HashSet::new(),
                upsert_delay: Duration::ZERO,
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BrokerCall> {
        self.inner.lock().calls.clone()
    }

    /// Payloads published to `topic`, in publish order
    pub fn published(&self, topic: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BrokerCall::Publish { topic: t, payload } if t == topic => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of receive handles opened on `queue`
    pub fn receivers_opened(&self, queue: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, BrokerCall::OpenReceiver { queue: q } if q == queue))
            .count()
    }

    /// While unreachable every operation fails with [`BrokerError::Unreachable`]
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.lock().reachable = reachable;
    }

    /// Make the next `n` receives fail regardless of reachability
    pub fn fail_next_receives(&self, n: usize) {
        self.inner.lock().failing_receives = n;
    }

    /// Make subscriptions to `topic` fail until cleared
    pub fn fail_subscriptions(&self, topic: &str, failing: bool) {
        let mut inner = self.inner.lock();
        if failing {
            inner.failing_subscriptions.insert(topic.to_string());
        } else {
            inner.failing_subscriptions.remove(topic);
        }
    }

    /// Hold every upsert for `delay` before it lands
    pub fn delay_upserts(&self, delay: Duration) {
        self.inner.lock().upsert_delay = delay;
    }

    /// The in-memory broker carrying the traffic
    pub fn memory(&self) -> &MemoryBroker {
        &self.memory
    }

    fn record(&self, call: BrokerCall) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        inner.check()
    }
}

/// Receive handle on a [`FakeBroker`] queue
pub struct FakeReceiver {
    inner: Arc<Mutex<FakeBrokerState>>,
    receiver: MemoryReceiver,
}

#[async_trait]
impl QueueReceiver for FakeReceiver {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        {
            let mut inner = self.inner.lock();
            if inner.failing_receives > 0 {
                inner.failing_receives -= 1;
                return Err(BrokerError::Unreachable("injected receive failure".to_string()));
            }
            inner.check()?;
        }
        self.receiver.receive(timeout).await
    }

    async fn close(&mut self) {
        self.receiver.close().await;
    }
}

#[async_trait]
impl Broker for FakeBroker {
    type Receiver = FakeReceiver;

    async fn open_receiver(&self, queue: &str) -> Result<FakeReceiver, BrokerError> {
        self.record(BrokerCall::OpenReceiver {
            queue: queue.to_string(),
        })?;
        Ok(FakeReceiver {
            inner: Arc::clone(&self.inner),
            receiver: self.memory.open_receiver(queue).await?,
        })
    }

    async fn submit(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        self.record(BrokerCall::Submit {
            queue: queue.to_string(),
            payload: payload.clone(),
        })?;
        self.memory.submit(queue, payload).await
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BrokerError> {
        self.record(BrokerCall::Publish {
            topic: topic.to_string(),
            payload: payload.clone(),
        })?;
        self.memory.publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        self.record(BrokerCall::Subscribe {
            topic: topic.to_string(),
        })?;
        if self.inner.lock().failing_subscriptions.contains(topic) {
            return Err(BrokerError::Unreachable(format!(
                "injected subscribe failure on {topic}"
            )));
        }
        self.memory.subscribe(topic).await
    }

    async fn upsert(&self, set: &str, key: &str, payload: String) -> Result<(), BrokerError> {
        self.record(BrokerCall::Upsert {
            set: set.to_string(),
            key: key.to_string(),
            payload: payload.clone(),
        })?;
        let delay = self.inner.lock().upsert_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.memory.upsert(set, key, payload).await
    }

    async fn set_entries(&self, set: &str) -> Result<Vec<String>, BrokerError> {
        self.inner.lock().check()?;
        self.memory.set_entries(set).await
    }

    async fn queue_entries(&self, queue: &str) -> Result<Vec<String>, BrokerError> {
        self.inner.lock().check()?;
        self.memory.queue_entries(queue).await
    }

    async fn clear(&self, name: &str) -> Result<(), BrokerError> {
        self.record(BrokerCall::Clear {
            name: name.to_string(),
        })?;
        self.memory.clear(name).await
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.inner.lock().calls.push(BrokerCall::Close);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
