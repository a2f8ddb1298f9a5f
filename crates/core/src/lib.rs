// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bq-core: bean types and the job status model shared by consumers and observers

pub mod clock;
pub mod codec;
pub mod command;
pub mod heartbeat;
pub mod id;
pub mod job;
pub mod names;
pub mod response;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use codec::{CodecError, Connector, JsonConnector};
pub use command::{CommandBean, CommandReply, ConsumerCommand};
pub use heartbeat::{ConsumerStatus, HeartbeatBean, KillBean};
pub use id::{ConsumerId, IdGen, JobId, SequentialIdGen, UuidIdGen};
pub use job::JobBean;
pub use names::QueueNames;
pub use response::{ResponseConfiguration, ResponseType};
pub use status::{Status, TransitionError};

/// A bean that carries a unique identity used to match requests and replies.
pub trait Identified {
    fn identity(&self) -> &str;
}
