// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bq daemon library
//!
//! Configuration and lifecycle for the `bqd` host process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;

pub use lifecycle::{exit_code, startup, Config, Daemon, LifecycleError, SimulationConfig};
