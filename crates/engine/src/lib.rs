// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bq consumer engine: receive loop, process execution and the listeners around it

mod broadcaster;
mod config;
mod connection;
mod consumer;
mod error;
mod executor;
mod heartbeat;
mod kill;
mod process;
mod receive;
mod registry;
mod request;
mod response;
mod simulated;
mod submit;
mod termination;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use broadcaster::{Broadcast, BroadcastError, StatusBroadcaster};
pub use config::{
    ConsumerConfig, DEFAULT_DOWNTIME_CEILING, DEFAULT_EXIT_GRACE, DEFAULT_HEARTBEAT_INTERVAL,
    DEFAULT_ID_MEMORY, DEFAULT_NOTIFICATION_INTERVAL, DEFAULT_POLL_TIMEOUT,
};
pub use connection::ConnectionManager;
pub use consumer::{Consumer, ShutdownRequest};
pub use error::{ConsumerError, ErrorKind};
pub use executor::ProcessExecutor;
pub use heartbeat::HeartbeatPublisher;
pub use kill::{KillListener, KillOrder};
pub use process::{ConsumerProcess, ProcessError, ProcessFactory};
pub use receive::{LoopExit, LoopSettings, ReceiveLoop};
pub use registry::ProcessRegistry;
pub use request::{Requester, Responder};
pub use response::ResponseWaiter;
pub use simulated::{SimulatedFactory, SimulatedProcess};
pub use submit::Submitter;
pub use termination::TerminationListener;
