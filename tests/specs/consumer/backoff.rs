//! Broker outage specs
//!
//! A durable consumer retries through outages shorter than the downtime
//! ceiling and gives up on one that lasts longer.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn short_outages_keep_retrying() {
    let spec = Spec::started().await;

    for _ in 0..3 {
        // Two failed polls, 4s of downtime against a 5s ceiling
        spec.broker.fail_next_receives(2);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(spec.consumer.is_active());
    }

    spec.submit("job-1").await;
    spec.running("job-1").await.release();
    assert!(spec.wait_for_status("job-1", Status::Complete).await);
    spec.consumer.disconnect().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn outage_past_ceiling_deactivates_consumer() {
    let spec = Spec::started().await;
    spec.broker.set_reachable(false);

    let exit = spec.consumer.join().await;
    assert!(matches!(exit, Some(LoopExit::BrokerLost { .. })), "{exit:?}");
    assert!(!spec.consumer.is_active());
    assert_eq!(
        *spec.consumer.shutdown_requests().borrow(),
        Some(ShutdownRequest::Fatal)
    );
}

#[tokio::test(start_paused = true)]
async fn non_durable_consumer_stops_on_first_error() {
    let spec = Spec::with_config(spec_config().with_durable(false));
    spec.consumer.start().await.unwrap();
    spec.broker.fail_next_receives(1);

    assert_eq!(spec.consumer.join().await, Some(LoopExit::NotDurable));
    assert_eq!(*spec.consumer.shutdown_requests().borrow(), None);
}
