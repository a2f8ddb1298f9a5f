//! Kill specs
//!
//! A KillBean addressed to this consumer stops it and, on request,
//! disconnects it or asks the host to exit.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn kill_with_disconnect_ends_loop_without_exit() {
    let spec = Spec::started().await;
    spec.submit("job-1").await;
    let process = spec.running("job-1").await;

    let kill = kill_bean(spec.consumer.consumer_id(), true, false);
    spec.consumer.submitter().kill(&kill).await.unwrap();

    assert_eq!(spec.consumer.join().await, Some(LoopExit::Stopped));
    assert!(wait_until(SPEC_WAIT_MAX, || spec.broker.calls().contains(&BrokerCall::Close)).await);
    assert_eq!(process.terminate_calls(), 1);
    assert!(!spec.consumer.is_active());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(*spec.consumer.shutdown_requests().borrow(), None);
}

#[tokio::test(start_paused = true)]
async fn kill_with_exit_asks_host_to_exit() {
    let spec = Spec::started().await;
    let mut requests = spec.consumer.shutdown_requests();

    let kill = kill_bean(spec.consumer.consumer_id(), false, true);
    spec.consumer.submitter().kill(&kill).await.unwrap();

    let request = *requests.wait_for(Option::is_some).await.unwrap();
    assert_eq!(request, Some(ShutdownRequest::Exit));
    assert_eq!(spec.consumer.join().await, Some(LoopExit::Stopped));
}
