//! Test helpers for behavioral specifications.
//!
//! Builds a consumer over a [`FakeBroker`] with a controllable runner and
//! reads back what it published.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::time::Duration;

pub use bq_adapters::{Broker, BrokerCall, FakeBroker};
pub use bq_core::test_support::{kill_bean, submitted_bean};
pub use bq_core::{Connector, FakeClock, JobBean, JobId, JsonConnector, Status};
pub use bq_engine::test_support::{wait_until, ManualFactory, ManualProcess};
pub use bq_engine::{Consumer, ConsumerConfig, LoopExit, ShutdownRequest};

/// Upper bound on any spec wait; paused time makes this free
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(60);

pub type SpecConsumer = Consumer<FakeBroker, JsonConnector, FakeClock>;

pub const QUEUE_ROOT: &str = "spec";

pub fn spec_config() -> ConsumerConfig {
    ConsumerConfig::new(QUEUE_ROOT)
        .with_consumer_id("spec-consumer")
        .with_name("Spec Consumer")
        .with_poll_timeout(Duration::from_millis(100))
        .with_notification_interval(Duration::from_secs(2))
        .with_downtime_ceiling(Duration::from_secs(5))
}

/// A consumer with a manual runner, not yet started
pub struct Spec {
    pub broker: FakeBroker,
    pub factory: ManualFactory,
    pub consumer: SpecConsumer,
}

impl Spec {
    pub fn new() -> Self {
        Self::with_config(spec_config())
    }

    pub fn with_config(config: ConsumerConfig) -> Self {
        let broker = FakeBroker::new();
        let factory = ManualFactory::new();
        let consumer = Consumer::new(broker.clone(), JsonConnector, FakeClock::new(), config);
        consumer.set_runner(factory.clone()).unwrap();
        Self {
            broker,
            factory,
            consumer,
        }
    }

    pub async fn started() -> Self {
        let spec = Self::new();
        spec.consumer.start().await.unwrap();
        spec
    }

    pub async fn submit(&self, id: &str) -> JobBean {
        self.consumer.submit(submitted_bean(id)).await.unwrap()
    }

    /// Wait for the runner to start `id`
    pub async fn running(&self, id: &str) -> std::sync::Arc<ManualProcess> {
        self.factory
            .started(id, SPEC_WAIT_MAX)
            .await
            .unwrap_or_else(|| panic!("{id} never started"))
    }

    /// Beans published on the status topic for `id`, in order
    pub fn topic_beans(&self, id: &str) -> Vec<JobBean> {
        self.broker
            .published(&self.consumer.names().status_topic)
            .iter()
            .map(|payload| JsonConnector.unmarshal::<JobBean>(payload).unwrap())
            .filter(|bean| bean.unique_id == id)
            .collect()
    }

    pub fn topic_statuses(&self, id: &str) -> Vec<Status> {
        self.topic_beans(id).iter().map(JobBean::status).collect()
    }

    /// Statuses written to the status set for `id`, in write order
    pub fn set_statuses(&self, id: &str) -> Vec<Status> {
        let set = self.consumer.names().status_set.clone();
        self.broker
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BrokerCall::Upsert { set: s, key, payload } if s == set && key == id => {
                    Some(JsonConnector.unmarshal::<JobBean>(&payload).unwrap().status())
                }
                _ => None,
            })
            .collect()
    }

    pub async fn wait_for_status(&self, id: &str, status: Status) -> bool {
        wait_until(SPEC_WAIT_MAX, || self.topic_statuses(id).last() == Some(&status)).await
    }
}
