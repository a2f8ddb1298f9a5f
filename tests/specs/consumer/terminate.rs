//! Termination specs
//!
//! REQUEST_TERMINATE on the status topic reaches the running process.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn terminate_request_stops_running_job() {
    let spec = Spec::started().await;
    let bean = spec.submit("job-1").await;
    let process = spec.running("job-1").await;

    spec.consumer
        .submitter()
        .request_terminate(&bean)
        .await
        .unwrap();

    assert!(wait_until(SPEC_WAIT_MAX, || process.terminate_calls() == 1).await);
    assert!(spec.wait_for_status("job-1", Status::Terminated).await);
    assert!(wait_until(SPEC_WAIT_MAX, || spec.consumer.active_jobs().is_empty()).await);
    spec.consumer.disconnect().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn terminate_request_for_unknown_id_is_a_no_op() {
    let spec = Spec::started().await;
    spec.submit("job-1").await;
    let process = spec.running("job-1").await;

    spec.consumer
        .submitter()
        .request_terminate(&submitted_bean("job-unknown"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(process.terminate_calls(), 0);
    assert!(spec.consumer.is_active());
    assert_eq!(spec.consumer.active_jobs(), vec![JobId::new("job-1")]);
    spec.consumer.disconnect().await.unwrap();
}
