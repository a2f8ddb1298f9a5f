// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kill listener: decides whether a KillBean targets this consumer

use bq_core::{ConsumerId, KillBean};

/// What the consumer must do after a kill addressed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillOrder {
    pub disconnect: bool,
    pub exit_process: bool,
}

pub struct KillListener {
    consumer_id: ConsumerId,
}

impl KillListener {
    pub fn new(consumer_id: ConsumerId) -> Self {
        Self { consumer_id }
    }

    /// `Some` only when the kill targets this consumer.
    pub fn handle(&self, kill: &KillBean) -> Option<KillOrder> {
        if kill.consumer_id != self.consumer_id {
            return None;
        }
        Some(KillOrder {
            disconnect: kill.disconnect,
            exit_process: kill.exit_process,
        })
    }
}

#[cfg(test)]
#[path = "kill_tests.rs"]
mod tests;
