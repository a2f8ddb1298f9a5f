// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process registry: job id to the live process running it
//!
//! Entries are weak so the registry never keeps a finished process alive.
//! The executor removes an entry when its process reaches a final status;
//! anything that slips past is purged on lookup.
//!
//! Reserved ids are remembered so an id cannot run twice. Past the capacity
//! the oldest finished ids are forgotten; ids of live processes never are.
//!
//! `terminate_all` closes the registry for good. A process that tries to
//! register afterwards is refused, so its job cannot outlive the stop.

use crate::config::DEFAULT_ID_MEMORY;
use crate::error::ConsumerError;
use crate::process::ConsumerProcess;
use bq_core::JobId;
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct RegistryState {
    live: HashMap<JobId, Weak<dyn ConsumerProcess>>,
    /// Reserved ids, oldest first
    seen: IndexSet<JobId>,
    capacity: usize,
    closed: bool,
}

impl RegistryState {
    fn remember(&mut self, id: &JobId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        let mut index = 0;
        while self.seen.len() > self.capacity && index < self.seen.len() {
            let live = self
                .seen
                .get_index(index)
                .is_some_and(|old| old == id || self.live.contains_key(old));
            if live {
                index += 1;
            } else {
                self.seen.shift_remove_index(index);
            }
        }
        true
    }
}

pub struct ProcessRegistry {
    inner: Mutex<RegistryState>,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ID_MEMORY)
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember up to `capacity` reserved ids, plus any still running.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                live: HashMap::new(),
                seen: IndexSet::new(),
                capacity: capacity.max(1),
                closed: false,
            }),
        }
    }

    /// Claim `id` for a new job. Remembered ids cannot be claimed again.
    pub fn reserve(&self, id: &JobId) -> Result<(), ConsumerError> {
        if self.inner.lock().remember(id) {
            Ok(())
        } else {
            Err(ConsumerError::Duplicate(id.clone()))
        }
    }

    pub fn was_reserved(&self, id: &str) -> bool {
        self.inner.lock().seen.contains(id)
    }

    /// Track a running process. Returns false once the registry is closed.
    pub fn register(&self, id: &JobId, process: &Arc<dyn ConsumerProcess>) -> bool {
        let mut inner = self.inner.lock();
        inner.remember(id);
        if inner.closed {
            return false;
        }
        inner.live.insert(id.clone(), Arc::downgrade(process));
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Missing ids are a no-op.
    pub fn deregister(&self, id: &str) -> bool {
        self.inner.lock().live.remove(id).is_some()
    }

    /// The live process for `id`, if it is still running.
    pub fn get(&self, id: &str) -> Option<Arc<dyn ConsumerProcess>> {
        let mut inner = self.inner.lock();
        let process = inner.live.get(id)?.upgrade();
        if process.is_none() {
            inner.live.remove(id);
        }
        process
    }

    /// Ids with a live process
    pub fn active_ids(&self) -> Vec<JobId> {
        let mut inner = self.inner.lock();
        inner.live.retain(|_, process| process.strong_count() > 0);
        let mut ids: Vec<JobId> = inner.live.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn len(&self) -> usize {
        self.active_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the registry, terminate every live process and empty the table.
    ///
    /// Works on a snapshot: processes that deregister themselves while being
    /// terminated do not disturb the sweep.
    pub async fn terminate_all(&self) {
        let snapshot: Vec<(JobId, Arc<dyn ConsumerProcess>)> = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner
                .live
                .iter()
                .filter_map(|(id, process)| process.upgrade().map(|p| (id.clone(), p)))
                .collect()
        };

        for (id, process) in snapshot {
            tracing::info!(job_id = %id, "terminating process");
            if let Err(e) = process.terminate().await {
                tracing::error!(job_id = %id, error = %e, "cannot terminate process");
            }
        }
        self.inner.lock().live.clear();
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
