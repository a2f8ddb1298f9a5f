// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::ErrorKind;
use bq_adapters::MemoryBroker;
use bq_core::{CommandBean, CommandReply, ConsumerCommand, ConsumerId, ConsumerStatus, JsonConnector};
use std::time::Duration;

const WINDOW: Duration = Duration::from_millis(500);

fn requester(broker: &MemoryBroker, config: ResponseConfiguration) -> Requester<MemoryBroker, JsonConnector> {
    Requester::new(broker.clone(), JsonConnector, "req", "resp", config)
}

/// Responder that answers every request as `name`
async fn spawn_responder(broker: &MemoryBroker, name: &'static str, cancel: &CancellationToken) {
    Responder::new(broker.clone(), JsonConnector, "req", "resp")
        .spawn(
            move |mut request: CommandBean| async move {
                request.reply = Some(CommandReply {
                    consumer_id: ConsumerId::new(name),
                    consumer_name: name.to_string(),
                    consumer_status: ConsumerStatus::Running,
                    active_jobs: Vec::new(),
                });
                Some(request)
            },
            cancel.clone(),
        )
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn one_returns_first_matching_reply() {
    let broker = MemoryBroker::new();
    let cancel = CancellationToken::new();
    spawn_responder(&broker, "alpha", &cancel).await;

    let request = CommandBean::new(ConsumerCommand::Ping);
    let reply = requester(&broker, ResponseConfiguration::one(WINDOW))
        .post(&request)
        .await
        .unwrap();
    assert_eq!(reply.unique_id, request.unique_id);
    assert_eq!(reply.reply.unwrap().consumer_name, "alpha");
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn one_or_more_collects_every_responder() {
    let broker = MemoryBroker::new();
    let cancel = CancellationToken::new();
    spawn_responder(&broker, "alpha", &cancel).await;
    spawn_responder(&broker, "beta", &cancel).await;

    let replies = requester(&broker, ResponseConfiguration::one_or_more(WINDOW))
        .collect(&CommandBean::new(ConsumerCommand::Status))
        .await
        .unwrap();
    let mut names: Vec<_> = replies
        .into_iter()
        .map(|r| r.reply.unwrap().consumer_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["alpha", "beta"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn no_responder_times_out() {
    let broker = MemoryBroker::new();
    let err = requester(&broker, ResponseConfiguration::one(WINDOW))
        .post(&CommandBean::new(ConsumerCommand::Ping))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn replies_for_other_requests_are_ignored() {
    let broker = MemoryBroker::new();
    let cancel = CancellationToken::new();
    // Answers with a different identity than the request
    Responder::new(broker.clone(), JsonConnector, "req", "resp")
        .spawn(
            |_: CommandBean| async move { Some(CommandBean::new(ConsumerCommand::Ping)) },
            cancel.clone(),
        )
        .await
        .unwrap();

    let err = requester(&broker, ResponseConfiguration::one(WINDOW))
        .post(&CommandBean::new(ConsumerCommand::Ping))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    cancel.cancel();
}

#[tokio::test]
async fn responder_stops_on_cancel() {
    let broker = MemoryBroker::new();
    let cancel = CancellationToken::new();
    let task = Responder::new(broker.clone(), JsonConnector, "req", "resp")
        .spawn(|r: CommandBean| async move { Some(r) }, cancel.clone())
        .await
        .unwrap();
    cancel.cancel();
    task.await.unwrap();
}
