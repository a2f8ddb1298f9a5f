// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat publisher
//!
//! Beats are serialized through one async lock, and `set_alive(false)`
//! flips the alive flag under that lock before sending STOPPED, so no
//! RUNNING beat can follow the final one.

use crate::error::ConsumerError;
use bq_adapters::Broker;
use bq_core::{Clock, Connector, ConsumerStatus, HeartbeatBean};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

struct Beacon {
    /// Identity fields copied into every beat
    identity: HeartbeatBean,
    last: HeartbeatBean,
    last_alive: u64,
    alive: bool,
}

pub struct HeartbeatPublisher<B, C, K> {
    broker: B,
    connector: C,
    clock: K,
    topic: String,
    interval: Duration,
    beacon: Mutex<Beacon>,
    publishing: tokio::sync::Mutex<()>,
}

impl<B: Broker, C: Connector, K: Clock> HeartbeatPublisher<B, C, K> {
    pub fn new(
        broker: B,
        connector: C,
        clock: K,
        topic: impl Into<String>,
        identity: HeartbeatBean,
        interval: Duration,
    ) -> Self {
        Self {
            broker,
            connector,
            clock,
            topic: topic.into(),
            interval,
            beacon: Mutex::new(Beacon {
                identity,
                last: HeartbeatBean::EMPTY,
                last_alive: 0,
                alive: false,
            }),
            publishing: tokio::sync::Mutex::new(()),
        }
    }

    /// Most recent beat, [`HeartbeatBean::EMPTY`] before the first
    pub fn last_beat(&self) -> HeartbeatBean {
        self.beacon.lock().last.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.beacon.lock().alive
    }

    /// Record activity; reported as `last_alive` on the next beat.
    pub fn touch(&self) {
        let now = self.clock.epoch_ms();
        self.beacon.lock().last_alive = now;
    }

    pub fn set_consumer_name(&self, name: impl Into<String>) {
        self.beacon.lock().identity.consumer_name = Some(name.into());
    }

    /// Start or stop beating. Going from alive to stopped sends one STOPPED beat.
    pub async fn set_alive(&self, alive: bool) -> Result<(), ConsumerError> {
        let _publishing = self.publishing.lock().await;
        let was_alive = {
            let now = self.clock.epoch_ms();
            let mut beacon = self.beacon.lock();
            let was_alive = beacon.alive;
            beacon.alive = alive;
            if alive && beacon.identity.conception_time.is_none() {
                beacon.identity.conception_time = Some(now);
                beacon.last_alive = now;
            }
            was_alive
        };
        if was_alive && !alive {
            self.publish(ConsumerStatus::Stopped).await?;
        }
        Ok(())
    }

    /// Send a RUNNING beat if alive.
    pub async fn beat(&self) -> Result<(), ConsumerError> {
        let _publishing = self.publishing.lock().await;
        if !self.is_alive() {
            return Ok(());
        }
        self.publish(ConsumerStatus::Running).await
    }

    /// Caller holds `publishing`.
    async fn publish(&self, status: ConsumerStatus) -> Result<(), ConsumerError> {
        let bean = {
            let beacon = self.beacon.lock();
            HeartbeatBean {
                publish_time: self.clock.epoch_ms(),
                last_alive: beacon.last_alive,
                consumer_status: Some(status),
                ..beacon.identity.clone()
            }
        };
        let payload = self.connector.marshal(&bean)?;
        self.broker.publish(&self.topic, payload).await?;
        tracing::trace!(status = %status, publish_time = bean.publish_time, "heartbeat");
        self.beacon.lock().last = bean;
        Ok(())
    }

    /// Beat every interval until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.beat().await {
                        tracing::warn!(topic = %self.topic, error = %e, "heartbeat publish failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
