// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer supervisor
//!
//! Owns the long-lived tasks of one consumer: the receive loop, the
//! heartbeat, and the listeners on the status, kill and command topics.
//! `stop` ends the receive loop and heartbeat and terminates running jobs;
//! `disconnect` additionally ends the listeners and closes the broker.

use crate::broadcaster::StatusBroadcaster;
use crate::config::ConsumerConfig;
use crate::connection::ConnectionManager;
use crate::error::ConsumerError;
use crate::executor::ProcessExecutor;
use crate::heartbeat::HeartbeatPublisher;
use crate::kill::{KillListener, KillOrder};
use crate::process::ProcessFactory;
use crate::receive::{LoopExit, LoopSettings, ReceiveLoop};
use crate::registry::ProcessRegistry;
use crate::request::Responder;
use crate::submit::Submitter;
use crate::termination::TerminationListener;
use bq_adapters::{Broker, Subscription};
use bq_core::{
    Clock, CommandBean, CommandReply, Connector, ConsumerCommand, ConsumerId, ConsumerStatus,
    HeartbeatBean, JobBean, JobId, KillBean, QueueNames,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Asks the hosting process to exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    /// A kill asked for the process to exit
    Exit,
    /// The broker was lost for longer than the downtime ceiling
    Fatal,
}

pub struct Consumer<B: Broker, C: Connector, K: Clock> {
    inner: Arc<Inner<B, C, K>>,
}

impl<B: Broker, C: Connector, K: Clock> Clone for Consumer<B, C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<B: Broker, C: Connector, K: Clock> {
    broker: B,
    connector: C,
    config: ConsumerConfig,
    names: QueueNames,
    name: Mutex<String>,
    runner: Mutex<Option<Arc<dyn ProcessFactory>>>,
    registry: Arc<ProcessRegistry>,
    broadcaster: Arc<StatusBroadcaster<B, C>>,
    heartbeat: Arc<HeartbeatPublisher<B, C, K>>,
    submitter: Submitter<B, C, K>,
    started: AtomicBool,
    stopped: AtomicBool,
    disconnected: AtomicBool,
    /// Receive loop and heartbeat
    loop_token: CancellationToken,
    /// Topic listeners
    connection_token: CancellationToken,
    exit: watch::Sender<Option<LoopExit>>,
    shutdown: watch::Sender<Option<ShutdownRequest>>,
}

impl<B: Broker, C: Connector, K: Clock> Consumer<B, C, K> {
    pub fn new(broker: B, connector: C, clock: K, config: ConsumerConfig) -> Self {
        let names = config.names();
        let broadcaster = Arc::new(StatusBroadcaster::new(
            broker.clone(),
            connector.clone(),
            names.status_topic.clone(),
            names.status_set.clone(),
        )
        .with_finals_capacity(config.id_memory));
        let heartbeat = Arc::new(HeartbeatPublisher::new(
            broker.clone(),
            connector.clone(),
            clock.clone(),
            names.heartbeat_topic.clone(),
            config.heartbeat_identity(),
            config.heartbeat_interval,
        ));
        let submitter = Submitter::new(
            broker.clone(),
            connector.clone(),
            clock,
            config.queue_root.clone(),
        );
        let id_memory = config.id_memory;
        let (exit, _) = watch::channel(None);
        let (shutdown, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                broker,
                connector,
                name: Mutex::new(config.name.clone()),
                names,
                config,
                runner: Mutex::new(None),
                registry: Arc::new(ProcessRegistry::with_capacity(id_memory)),
                broadcaster,
                heartbeat,
                submitter,
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                disconnected: AtomicBool::new(false),
                loop_token: CancellationToken::new(),
                connection_token: CancellationToken::new(),
                exit,
                shutdown,
            }),
        }
    }

    pub fn consumer_id(&self) -> &ConsumerId {
        &self.inner.config.consumer_id
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.inner.config
    }

    pub fn names(&self) -> &QueueNames {
        &self.inner.names
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.inner.heartbeat.set_consumer_name(name.clone());
        *self.inner.name.lock() = name;
    }

    /// Install the process factory. Fixed once the consumer has started.
    pub fn set_runner(&self, factory: impl ProcessFactory) -> Result<(), ConsumerError> {
        if self.inner.started.load(Ordering::SeqCst) {
            return Err(ConsumerError::RunnerLocked);
        }
        *self.inner.runner.lock() = Some(Arc::new(factory));
        Ok(())
    }

    /// Begin consuming. Topic subscriptions are live when this returns.
    pub async fn start(&self) -> Result<(), ConsumerError> {
        let inner = &self.inner;
        let Some(factory) = inner.runner.lock().clone() else {
            return Err(ConsumerError::MissingRunner);
        };
        if inner.stopped.load(Ordering::SeqCst) {
            return Err(ConsumerError::Stopped);
        }
        if inner.started.load(Ordering::SeqCst) {
            return Err(ConsumerError::AlreadyStarted);
        }

        // All subscriptions first; a failed start leaves the consumer unstarted
        let status = inner.broker.subscribe(&inner.names.status_topic).await?;
        let kills = inner.broker.subscribe(&inner.names.kill_topic).await?;
        let responder = Responder::new(
            inner.broker.clone(),
            inner.connector.clone(),
            inner.names.command_topic.clone(),
            inner.names.command_response_topic.clone(),
        );
        let commands = responder.listen().await?;
        if inner.started.swap(true, Ordering::SeqCst) {
            return Err(ConsumerError::AlreadyStarted);
        }
        inner.heartbeat.set_alive(true).await?;

        let weak = Arc::downgrade(inner);
        responder.serve(
            commands,
            move |request: CommandBean| {
                let weak: Weak<Inner<B, C, K>> = weak.clone();
                async move { weak.upgrade()?.answer(request).await }
            },
            inner.connection_token.clone(),
        );

        tokio::spawn(
            TerminationListener::new(Arc::clone(&inner.registry), inner.connector.clone())
                .run(status, inner.connection_token.clone()),
        );
        tokio::spawn(Arc::clone(inner).listen_for_kills(kills));
        tokio::spawn(Arc::clone(&inner.heartbeat).run(inner.loop_token.clone()));

        let executor = Arc::new(ProcessExecutor::new(
            Arc::clone(&inner.broadcaster),
            Arc::clone(&inner.registry),
            Some(factory),
        ));
        let receive_loop = ReceiveLoop::new(
            ConnectionManager::connect(inner.broker.clone(), inner.names.submission_queue.clone()),
            inner.connector.clone(),
            executor,
            Arc::clone(&inner.heartbeat),
            LoopSettings {
                durable: inner.config.durable,
                poll_timeout: inner.config.poll_timeout,
                notification_interval: inner.config.notification_interval,
                downtime_ceiling: inner.config.downtime_ceiling,
            },
            inner.loop_token.clone(),
        );
        tokio::spawn(Arc::clone(inner).supervise(receive_loop));

        tracing::info!(
            consumer_id = %inner.config.consumer_id,
            name = %inner.name(),
            queue = %inner.names.submission_queue,
            "consumer started"
        );
        Ok(())
    }

    /// Stop receiving and terminate running jobs. Idempotent.
    pub async fn stop(&self) -> Result<(), ConsumerError> {
        self.inner.stop().await
    }

    /// Stop, end the topic listeners and close the broker. Idempotent.
    pub async fn disconnect(&self) -> Result<(), ConsumerError> {
        self.inner.disconnect().await
    }

    /// Wait for the receive loop to end. `None` if the consumer never started.
    pub async fn join(&self) -> Option<LoopExit> {
        if !self.inner.started.load(Ordering::SeqCst) {
            return None;
        }
        let mut exit = self.inner.exit.subscribe();
        let ended = exit.wait_for(Option::is_some).await.ok()?;
        *ended
    }

    /// Exit requests raised by kills or a lost broker
    pub fn shutdown_requests(&self) -> watch::Receiver<Option<ShutdownRequest>> {
        self.inner.shutdown.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        self.inner.registry.active_ids()
    }

    /// Most recent heartbeat sent
    pub fn heartbeat(&self) -> HeartbeatBean {
        self.inner.heartbeat.last_beat()
    }

    pub fn submitter(&self) -> &Submitter<B, C, K> {
        &self.inner.submitter
    }

    pub async fn submit(&self, bean: JobBean) -> Result<JobBean, ConsumerError> {
        self.inner.submitter.submit(bean).await
    }

    /// Beans waiting on the submission queue, oldest first
    pub async fn submission_queue(&self) -> Result<Vec<JobBean>, ConsumerError> {
        let entries = self
            .inner
            .broker
            .queue_entries(&self.inner.names.submission_queue)
            .await?;
        Ok(self.inner.decode_all(&entries))
    }

    /// Last known state of every bean this consumer has seen
    pub async fn status_set(&self) -> Result<Vec<JobBean>, ConsumerError> {
        let entries = self
            .inner
            .broker
            .set_entries(&self.inner.names.status_set)
            .await?;
        Ok(self.inner.decode_all(&entries))
    }

    /// Empty the submission queue and the status set.
    pub async fn clear_queues(&self) -> Result<(), ConsumerError> {
        self.inner
            .broker
            .clear(&self.inner.names.submission_queue)
            .await?;
        self.inner.broker.clear(&self.inner.names.status_set).await?;
        Ok(())
    }
}

impl<B: Broker, C: Connector, K: Clock> Inner<B, C, K> {
    fn name(&self) -> String {
        self.name.lock().clone()
    }

    fn is_active(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.loop_token.is_cancelled()
    }

    async fn stop(&self) -> Result<(), ConsumerError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(consumer_id = %self.config.consumer_id, "stopping consumer");
        self.loop_token.cancel();
        let stopped = self.heartbeat.set_alive(false).await;
        self.registry.terminate_all().await;
        stopped
    }

    async fn disconnect(&self) -> Result<(), ConsumerError> {
        let stopped = self.stop().await;
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return stopped;
        }
        tracing::info!(consumer_id = %self.config.consumer_id, "disconnecting consumer");
        self.connection_token.cancel();
        self.broker.close().await?;
        stopped
    }

    async fn supervise(self: Arc<Self>, receive_loop: ReceiveLoop<B, C, K>) {
        let exit = receive_loop.run().await;
        match exit {
            LoopExit::Stopped => {}
            LoopExit::NotDurable => {
                if let Err(e) = self.stop().await {
                    tracing::warn!(error = %e, "error stopping non-durable consumer");
                }
            }
            LoopExit::BrokerLost { downtime } => {
                let lost = ConsumerError::BrokerLost { downtime };
                tracing::error!(consumer_id = %self.config.consumer_id, error = %lost, "giving up on broker");
                if let Err(e) = self.stop().await {
                    tracing::warn!(error = %e, "error stopping consumer after broker loss");
                }
                self.shutdown.send_replace(Some(ShutdownRequest::Fatal));
            }
        }
        self.exit.send_replace(Some(exit));
    }

    async fn listen_for_kills(self: Arc<Self>, mut kills: Subscription) {
        let listener = KillListener::new(self.config.consumer_id.clone());
        loop {
            let payload = tokio::select! {
                _ = self.connection_token.cancelled() => break,
                payload = kills.recv() => payload,
            };
            let Some(payload) = payload else {
                tracing::warn!(topic = kills.topic(), "kill subscription ended");
                break;
            };
            let kill: KillBean = match self.connector.unmarshal(&payload) {
                Ok(kill) => kill,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable kill");
                    continue;
                }
            };
            if let Some(order) = listener.handle(&kill) {
                self.obey(order).await;
            }
        }
    }

    async fn obey(&self, order: KillOrder) {
        tracing::warn!(
            consumer_id = %self.config.consumer_id,
            disconnect = order.disconnect,
            exit = order.exit_process,
            "kill received"
        );
        if let Err(e) = self.stop().await {
            tracing::warn!(error = %e, "error stopping killed consumer");
        }
        if order.disconnect {
            if let Err(e) = self.disconnect().await {
                tracing::warn!(error = %e, "error disconnecting killed consumer");
            }
        }
        if order.exit_process {
            tokio::time::sleep(self.config.exit_grace).await;
            tracing::warn!(consumer_id = %self.config.consumer_id, "requesting process exit");
            self.shutdown.send_replace(Some(ShutdownRequest::Exit));
        }
    }

    /// Reply to a command addressed to this consumer.
    async fn answer(&self, mut request: CommandBean) -> Option<CommandBean> {
        if request.reply.is_some() || !request.is_for(&self.config.consumer_id) {
            return None;
        }
        match self.connector.marshal(&request) {
            Ok(payload) => {
                if let Err(e) = self
                    .broker
                    .upsert(&self.names.command_set, &request.unique_id, payload)
                    .await
                {
                    tracing::warn!(error = %e, "cannot record command");
                }
            }
            Err(e) => tracing::warn!(error = %e, "cannot record command"),
        }

        let active_jobs = match request.command {
            ConsumerCommand::Ping => Vec::new(),
            ConsumerCommand::Status => self.registry.active_ids(),
        };
        let consumer_status = if self.is_active() {
            ConsumerStatus::Running
        } else {
            ConsumerStatus::Stopped
        };
        tracing::debug!(command_id = %request.unique_id, command = ?request.command, "answering command");
        request.reply = Some(CommandReply {
            consumer_id: self.config.consumer_id.clone(),
            consumer_name: self.name(),
            consumer_status,
            active_jobs,
        });
        Some(request)
    }

    fn decode_all<T: DeserializeOwned>(&self, entries: &[String]) -> Vec<T> {
        entries
            .iter()
            .filter_map(|entry| match self.connector.unmarshal(entry) {
                Ok(bean) => Some(bean),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable entry");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
