// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector that turns beans into broker payloads and back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Payload could not be converted to or from a bean.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot marshal bean: {0}")]
    Marshal(String),
    #[error("cannot unmarshal bean: {0}")]
    Unmarshal(String),
}

/// Bean marshalling service injected into the consumer.
///
/// Implementations must round-trip every field of the bean types losslessly.
pub trait Connector: Clone + Send + Sync + 'static {
    fn marshal<T: Serialize>(&self, bean: &T) -> Result<String, CodecError>;

    fn unmarshal<T: DeserializeOwned>(&self, payload: &str) -> Result<T, CodecError>;
}

/// JSON connector backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConnector;

impl Connector for JsonConnector {
    fn marshal<T: Serialize>(&self, bean: &T) -> Result<String, CodecError> {
        serde_json::to_string(bean).map_err(|e| CodecError::Marshal(e.to_string()))
    }

    fn unmarshal<T: DeserializeOwned>(&self, payload: &str) -> Result<T, CodecError> {
        serde_json::from_str(payload).map_err(|e| CodecError::Unmarshal(e.to_string()))
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
