// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! How a request/response exchange waits for replies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reply-collection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    /// Return on the first reply; fail if none arrives within the timeout.
    One,
    /// Wait out the whole timeout collecting replies; fail only if none arrived.
    OneOrMore,
}

/// Wait policy for a request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfiguration {
    pub response_type: ResponseType,
    pub timeout: Duration,
}

impl ResponseConfiguration {
    pub fn new(response_type: ResponseType, timeout: Duration) -> Self {
        Self {
            response_type,
            timeout,
        }
    }

    pub fn one(timeout: Duration) -> Self {
        Self::new(ResponseType::One, timeout)
    }

    pub fn one_or_more(timeout: Duration) -> Self {
        Self::new(ResponseType::OneOrMore, timeout)
    }
}

impl Default for ResponseConfiguration {
    fn default() -> Self {
        Self::one(Duration::from_secs(1))
    }
}
