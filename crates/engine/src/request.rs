// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response over a pair of topics
//!
//! A requester publishes a bean on the request topic and collects replies
//! carrying the same identity from the response topic. A responder answers
//! each request with whatever its handler returns.

use crate::error::ConsumerError;
use crate::response::ResponseWaiter;
use bq_adapters::{Broker, Subscription};
use bq_core::{Connector, Identified, ResponseConfiguration, ResponseType};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Requester<B, C> {
    broker: B,
    connector: C,
    request_topic: String,
    response_topic: String,
    config: ResponseConfiguration,
}

impl<B: Broker, C: Connector> Requester<B, C> {
    pub fn new(
        broker: B,
        connector: C,
        request_topic: impl Into<String>,
        response_topic: impl Into<String>,
        config: ResponseConfiguration,
    ) -> Self {
        Self {
            broker,
            connector,
            request_topic: request_topic.into(),
            response_topic: response_topic.into(),
            config,
        }
    }

    /// Send `request` and return the reply: the first under ONE, the last
    /// under ONE_OR_MORE.
    pub async fn post<T>(&self, request: &T) -> Result<T, ConsumerError>
    where
        T: Serialize + DeserializeOwned + Identified + Send + 'static,
    {
        let mut replies = self.collect(request).await?;
        let reply = match self.config.response_type {
            ResponseType::One => replies.into_iter().next(),
            ResponseType::OneOrMore => replies.pop(),
        };
        reply.ok_or(ConsumerError::Timeout(self.config.timeout))
    }

    /// Send `request` and return every matching reply, in arrival order.
    pub async fn collect<T>(&self, request: &T) -> Result<Vec<T>, ConsumerError>
    where
        T: Serialize + DeserializeOwned + Identified + Send + 'static,
    {
        let id = request.identity().to_string();
        let payload = self.connector.marshal(request)?;
        // Subscribe first so a fast responder cannot be missed
        let mut subscription = self.broker.subscribe(&self.response_topic).await?;

        let waiter = Arc::new(ResponseWaiter::new(self.config));
        let replies: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));
        let collector = tokio::spawn({
            let waiter = Arc::clone(&waiter);
            let replies = Arc::clone(&replies);
            let connector = self.connector.clone();
            let id = id.clone();
            async move {
                while let Some(payload) = subscription.recv().await {
                    match connector.unmarshal::<T>(&payload) {
                        Ok(reply) if reply.identity() == id => {
                            replies.lock().push(reply);
                            waiter.count_down();
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!(error = %e, "ignoring undecodable reply"),
                    }
                }
            }
        });

        tracing::debug!(request_id = %id, topic = %self.request_topic, "posting request");
        if let Err(e) = self.broker.publish(&self.request_topic, payload).await {
            collector.abort();
            return Err(e.into());
        }
        let waited = waiter.wait().await;
        collector.abort();
        waited?;

        let collected = std::mem::take(&mut *replies.lock());
        Ok(collected)
    }
}

pub struct Responder<B, C> {
    broker: B,
    connector: C,
    request_topic: String,
    response_topic: String,
}

impl<B: Broker, C: Connector> Responder<B, C> {
    pub fn new(
        broker: B,
        connector: C,
        request_topic: impl Into<String>,
        response_topic: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            connector,
            request_topic: request_topic.into(),
            response_topic: response_topic.into(),
        }
    }

    /// Answer requests until cancelled. A handler returning `None` sends no reply.
    ///
    /// The subscription is live when this returns.
    pub async fn spawn<T, F, Fut>(
        &self,
        handler: F,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, ConsumerError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let subscription = self.listen().await?;
        Ok(self.serve(subscription, handler, cancel))
    }

    /// Subscribe to the request topic without answering yet.
    pub async fn listen(&self) -> Result<Subscription, ConsumerError> {
        Ok(self.broker.subscribe(&self.request_topic).await?)
    }

    /// Answer requests arriving on `subscription` until cancelled.
    pub fn serve<T, F, Fut>(
        &self,
        mut subscription: Subscription,
        handler: F,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let broker = self.broker.clone();
        let connector = self.connector.clone();
        let response_topic = self.response_topic.clone();

        tokio::spawn(async move {
            loop {
                let payload = tokio::select! {
                    _ = cancel.cancelled() => break,
                    payload = subscription.recv() => payload,
                };
                let Some(payload) = payload else {
                    tracing::warn!(topic = subscription.topic(), "request subscription ended");
                    break;
                };
                let request = match connector.unmarshal::<T>(&payload) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping undecodable request");
                        continue;
                    }
                };
                let Some(reply) = handler(request).await else {
                    continue;
                };
                let sent = match connector.marshal(&reply) {
                    Ok(reply) => broker
                        .publish(&response_topic, reply)
                        .await
                        .map_err(ConsumerError::from),
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = sent {
                    tracing::warn!(topic = %response_topic, error = %e, "cannot send reply");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
