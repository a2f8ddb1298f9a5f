// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker
//!
//! Clones share one broker, so a submitter and a consumer in the same process
//! can talk through it. Used for embedding and for tests.

use super::{Broker, BrokerError, QueueReceiver, Subscription};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

#[derive(Default)]
struct MemoryState {
    queues: HashMap<String, VecDeque<String>>,
    topics: HashMap<String, Vec<mpsc::UnboundedSender<String>>>,
    sets: HashMap<String, IndexMap<String, String>>,
}

/// Broker held entirely in memory
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<MemoryState>>,
    /// Woken on every submit so blocked receivers re-check their queue
    arrivals: Arc<Notify>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let mut state = self.state.lock();
        match state.topics.get_mut(topic) {
            Some(subs) => {
                subs.retain(|tx| !tx.is_closed());
                subs.len()
            }
            None => 0,
        }
    }

    fn pop(&self, queue: &str) -> Option<String> {
        self.state
            .lock()
            .queues
            .get_mut(queue)
            .and_then(VecDeque::pop_front)
    }
}

/// Receive handle on one in-memory queue
pub struct MemoryReceiver {
    broker: MemoryBroker,
    queue: String,
    closed: bool,
}

#[async_trait]
impl QueueReceiver for MemoryReceiver {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        if self.closed {
            return Err(BrokerError::Closed);
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking so a submit between the
            // check and the wait is not missed.
            let notified = self.broker.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.broker.pop(&self.queue) {
                return Ok(Some(payload));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    type Receiver = MemoryReceiver;

    async fn open_receiver(&self, queue: &str) -> Result<MemoryReceiver, BrokerError> {
        Ok(MemoryReceiver {
            broker: self.clone(),
            queue: queue.to_string(),
            closed: false,
        })
    }

    async fn submit(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        self.state
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload);
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        if let Some(subs) = state.topics.get_mut(topic) {
            subs.retain(|tx| tx.send(payload.clone()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(Subscription::new(topic, rx))
    }

    async fn upsert(&self, set: &str, key: &str, payload: String) -> Result<(), BrokerError> {
        self.state
            .lock()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(key.to_string(), payload);
        Ok(())
    }

    async fn set_entries(&self, set: &str) -> Result<Vec<String>, BrokerError> {
        Ok(self
            .state
            .lock()
            .sets
            .get(set)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn queue_entries(&self, queue: &str) -> Result<Vec<String>, BrokerError> {
        Ok(self
            .state
            .lock()
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, name: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.queues.remove(name);
        state.sets.remove(name);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
