// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Receive-side connection to the submission queue
//!
//! The manager owns at most one receive handle. Any failure discards it, and
//! the next receive opens a fresh one, so callers never retry on a handle that
//! is half broken.

use bq_adapters::{Broker, BrokerError, QueueReceiver};
use std::time::Duration;

pub struct ConnectionManager<B: Broker> {
    broker: B,
    queue: String,
    receiver: Option<B::Receiver>,
    /// Set after a failure until a handle opens again
    lost: bool,
}

impl<B: Broker> ConnectionManager<B> {
    /// No I/O happens until the first receive.
    pub fn connect(broker: B, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
            receiver: None,
            lost: false,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn is_connected(&self) -> bool {
        self.receiver.is_some()
    }

    /// Wait up to `timeout` for one payload.
    pub async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        if self.receiver.is_none() {
            let receiver = match self.broker.open_receiver(&self.queue).await {
                Ok(receiver) => receiver,
                Err(e) => {
                    self.mark_lost(&e);
                    return Err(e);
                }
            };
            if self.lost {
                tracing::info!(queue = %self.queue, "submission connection restored");
            } else {
                tracing::info!(queue = %self.queue, "submission connection made");
            }
            self.lost = false;
            self.receiver = Some(receiver);
        }

        let Some(receiver) = self.receiver.as_mut() else {
            return Err(BrokerError::Closed);
        };
        match receiver.receive(timeout).await {
            Ok(payload) => Ok(payload),
            Err(e) => {
                self.discard().await;
                self.mark_lost(&e);
                Err(e)
            }
        }
    }

    /// Put a payload taken after shutdown began back on the queue.
    ///
    /// It goes to the back of the queue; another consumer may pick it up.
    pub async fn requeue(&self, payload: String) -> Result<(), BrokerError> {
        self.broker.submit(&self.queue, payload).await
    }

    /// Release the receive handle, if any.
    pub async fn close(&mut self) {
        self.discard().await;
    }

    async fn discard(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.close().await;
        }
    }

    fn mark_lost(&mut self, error: &BrokerError) {
        if !self.lost {
            tracing::warn!(queue = %self.queue, error = %error, "submission connection lost");
        }
        self.lost = true;
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
