// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ConsumerId, JobBean, KillBean, Status};

// ── Bean factory functions ──────────────────────────────────────────────────

/// A freshly submitted bean with a fixed id.
pub fn submitted_bean(id: &str) -> JobBean {
    let mut bean = JobBean::with_id(id, format!("job {id}"));
    bean.user_name = Some("tester".to_string());
    bean.beamline = Some("bl-test".to_string());
    bean
}

/// A control bean asking whoever runs `id` to terminate it.
pub fn request_terminate_bean(id: &str) -> JobBean {
    let mut bean = JobBean::with_id(id, format!("job {id}"));
    // SUBMITTED -> REQUEST_TERMINATE is always legal
    let _ = bean.set_status(Status::RequestTerminate);
    bean
}

pub fn kill_bean(consumer_id: &ConsumerId, disconnect: bool, exit_process: bool) -> KillBean {
    KillBean::new(consumer_id.clone())
        .with_disconnect(disconnect)
        .with_exit_process(exit_process)
}
