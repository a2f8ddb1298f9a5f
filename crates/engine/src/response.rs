// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response wait coordinator
//!
//! ONE returns at the first reply. ONE_OR_MORE always waits out the whole
//! window so every responder gets a chance to answer, and fails only when
//! nobody did.

use crate::error::ConsumerError;
use bq_core::{ResponseConfiguration, ResponseType};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub struct ResponseWaiter {
    config: ResponseConfiguration,
    found: AtomicBool,
    replies: AtomicUsize,
    arrived: Notify,
}

impl ResponseWaiter {
    pub fn new(config: ResponseConfiguration) -> Self {
        Self {
            config,
            found: AtomicBool::new(false),
            replies: AtomicUsize::new(0),
            arrived: Notify::new(),
        }
    }

    pub fn config(&self) -> &ResponseConfiguration {
        &self.config
    }

    /// Record one reply. Replies counted before `wait` starts still count.
    pub fn count_down(&self) {
        self.replies.fetch_add(1, Ordering::SeqCst);
        self.found.store(true, Ordering::SeqCst);
        self.arrived.notify_one();
    }

    pub fn replies(&self) -> usize {
        self.replies.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) -> Result<(), ConsumerError> {
        let timeout = self.config.timeout;
        match self.config.response_type {
            ResponseType::One => {
                if self.found.load(Ordering::SeqCst) {
                    return Ok(());
                }
                tokio::time::timeout(timeout, self.arrived.notified())
                    .await
                    .map_err(|_| ConsumerError::Timeout(timeout))
            }
            ResponseType::OneOrMore => {
                tokio::time::sleep(timeout).await;
                if self.found.load(Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(ConsumerError::Timeout(timeout))
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
