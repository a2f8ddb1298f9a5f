// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controllable processes and publishers for tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::broadcaster::{Broadcast, BroadcastError};
use crate::process::{ConsumerProcess, ProcessError, ProcessFactory};
use async_trait::async_trait;
use bq_core::{JobBean, JobId, Status};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Publisher that keeps every bean it is asked to broadcast
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    beans: Arc<Mutex<Vec<JobBean>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beans(&self) -> Vec<JobBean> {
        self.beans.lock().clone()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.beans.lock().iter().map(JobBean::status).collect()
    }
}

#[async_trait]
impl Broadcast for RecordingPublisher {
    async fn broadcast(&self, bean: &JobBean) -> Result<(), BroadcastError> {
        self.beans.lock().push(bean.clone());
        Ok(())
    }
}

/// Process that runs until the test finishes or terminates it
pub struct ManualProcess {
    bean: Mutex<JobBean>,
    publisher: Arc<dyn Broadcast>,
    finish: CancellationToken,
    terminate: CancellationToken,
    terminations: AtomicUsize,
    started: CancellationToken,
    failure: Option<String>,
}

impl ManualProcess {
    pub fn new(bean: JobBean, publisher: Arc<dyn Broadcast>) -> Self {
        Self {
            bean: Mutex::new(bean),
            publisher,
            finish: CancellationToken::new(),
            terminate: CancellationToken::new(),
            terminations: AtomicUsize::new(0),
            started: CancellationToken::new(),
            failure: None,
        }
    }

    /// Make `execute` return an error once released
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Let `execute` complete
    pub fn release(&self) {
        self.finish.cancel();
    }

    pub fn terminate_calls(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Resolves once `execute` has broadcast RUNNING
    pub async fn wait_started(&self) {
        self.started.cancelled().await;
    }

    async fn publish(&self, status: Status, percent: Option<f64>) -> Result<(), ProcessError> {
        let snapshot = {
            let mut bean = self.bean.lock();
            bean.set_status(status)?;
            if let Some(percent) = percent {
                bean.set_percent_complete(percent);
            }
            bean.clone()
        };
        self.publisher.broadcast(&snapshot).await?;
        Ok(())
    }
}

#[async_trait]
impl ConsumerProcess for ManualProcess {
    fn bean(&self) -> JobBean {
        self.bean.lock().clone()
    }

    async fn execute(&self) -> Result<(), ProcessError> {
        self.publish(Status::Running, Some(0.0)).await?;
        self.started.cancel();
        tokio::select! {
            _ = self.terminate.cancelled() => self.publish(Status::Terminated, None).await,
            _ = self.finish.cancelled() => match &self.failure {
                Some(message) => Err(ProcessError::Failed(message.clone())),
                None => self.publish(Status::Complete, Some(100.0)).await,
            },
        }
    }

    async fn terminate(&self) -> Result<(), ProcessError> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.terminate.cancel();
        Ok(())
    }
}

#[derive(Default)]
struct ManualFactoryState {
    processes: HashMap<JobId, Arc<ManualProcess>>,
    created: Vec<JobId>,
    fail_create: Option<String>,
    fail_execute: Option<String>,
}

/// Factory handing out [`ManualProcess`] instances the test can reach by id
#[derive(Clone, Default)]
pub struct ManualFactory {
    inner: Arc<Mutex<ManualFactoryState>>,
}

impl ManualFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&self, id: &str) -> Option<Arc<ManualProcess>> {
        self.inner.lock().processes.get(id).cloned()
    }

    /// Ids in creation order
    pub fn created(&self) -> Vec<JobId> {
        self.inner.lock().created.clone()
    }

    pub fn fail_create(&self, message: impl Into<String>) {
        self.inner.lock().fail_create = Some(message.into());
    }

    /// Processes created from now on fail once released
    pub fn fail_execute(&self, message: impl Into<String>) {
        self.inner.lock().fail_execute = Some(message.into());
    }

    /// Wait until a process for `id` exists and has started running
    pub async fn started(&self, id: &str, within: Duration) -> Option<Arc<ManualProcess>> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if let Some(process) = self.process(id) {
                return tokio::time::timeout_at(deadline, process.wait_started())
                    .await
                    .ok()
                    .map(|()| process);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl ProcessFactory for ManualFactory {
    fn create(
        &self,
        bean: JobBean,
        publisher: Arc<dyn Broadcast>,
    ) -> Result<Arc<dyn ConsumerProcess>, ProcessError> {
        let mut inner = self.inner.lock();
        if let Some(message) = &inner.fail_create {
            return Err(ProcessError::Failed(message.clone()));
        }
        let id = bean.unique_id.clone();
        let mut process = ManualProcess::new(bean, publisher);
        if let Some(message) = &inner.fail_execute {
            process = process.failing(message.clone());
        }
        let process = Arc::new(process);
        inner.processes.insert(id.clone(), Arc::clone(&process));
        inner.created.push(id);
        Ok(process)
    }
}

/// Poll `check` until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
