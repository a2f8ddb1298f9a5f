//! Request/response wait specs
//!
//! ONE returns at the first matching reply; ONE_OR_MORE always waits out
//! the window and fails only when nothing arrived.

use crate::prelude::*;
use bq_core::{CommandBean, ConsumerCommand, ResponseConfiguration};
use bq_engine::{ErrorKind, Requester, Responder};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const WINDOW: Duration = Duration::from_millis(1000);
const REPLY_AT: Duration = Duration::from_millis(100);
const REQUESTS: &str = "spec.requests";
const REPLIES: &str = "spec.replies";

/// Answers every request after `REPLY_AT`
async fn slow_responder(broker: &FakeBroker, cancel: &CancellationToken) {
    Responder::new(broker.clone(), JsonConnector, REQUESTS, REPLIES)
        .spawn(
            |request: CommandBean| async move {
                tokio::time::sleep(REPLY_AT).await;
                Some(request)
            },
            cancel.clone(),
        )
        .await
        .unwrap();
}

fn requester(broker: &FakeBroker, config: ResponseConfiguration) -> Requester<FakeBroker, JsonConnector> {
    Requester::new(broker.clone(), JsonConnector, REQUESTS, REPLIES, config)
}

#[tokio::test(start_paused = true)]
async fn one_returns_at_first_reply() {
    let broker = FakeBroker::new();
    let cancel = CancellationToken::new();
    slow_responder(&broker, &cancel).await;

    let request = CommandBean::new(ConsumerCommand::Ping);
    let start = Instant::now();
    let reply = requester(&broker, ResponseConfiguration::one(WINDOW))
        .post(&request)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(reply.unique_id, request.unique_id);
    assert!(elapsed >= REPLY_AT && elapsed < WINDOW / 2, "{elapsed:?}");
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn one_or_more_waits_out_the_window() {
    let broker = FakeBroker::new();
    let cancel = CancellationToken::new();
    slow_responder(&broker, &cancel).await;

    let request = CommandBean::new(ConsumerCommand::Ping);
    let start = Instant::now();
    let reply = requester(&broker, ResponseConfiguration::one_or_more(WINDOW))
        .post(&request)
        .await
        .unwrap();

    assert_eq!(reply.unique_id, request.unique_id);
    assert!(start.elapsed() >= WINDOW);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn one_or_more_without_replies_times_out() {
    let broker = FakeBroker::new();

    let start = Instant::now();
    let err = requester(&broker, ResponseConfiguration::one_or_more(WINDOW))
        .post(&CommandBean::new(ConsumerCommand::Ping))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(start.elapsed() >= WINDOW);
}
