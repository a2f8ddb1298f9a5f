//! Duplicate id specs
//!
//! A consumer never runs the same id twice.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn duplicate_while_active_is_rejected() {
    let spec = Spec::started().await;
    spec.submit("job-1").await;
    let first = spec.running("job-1").await;

    spec.submit("job-1").await;
    // Several poll cycles, so the duplicate has been received
    tokio::time::sleep(Duration::from_secs(1)).await;
    let queued = spec.consumer.submission_queue().await.unwrap();
    assert!(queued.is_empty());

    assert_eq!(spec.factory.created(), vec![JobId::new("job-1")]);
    assert_eq!(spec.consumer.active_jobs(), vec![JobId::new("job-1")]);

    first.release();
    assert!(spec.wait_for_status("job-1", Status::Complete).await);
    assert_eq!(
        spec.topic_statuses("job-1"),
        vec![Status::Running, Status::Complete]
    );
    spec.consumer.disconnect().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn finished_id_is_not_run_again() {
    let spec = Spec::started().await;
    spec.submit("job-1").await;
    spec.running("job-1").await.release();
    assert!(spec.wait_for_status("job-1", Status::Complete).await);

    spec.submit("job-1").await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(spec.factory.created(), vec![JobId::new("job-1")]);
    assert_eq!(
        spec.topic_statuses("job-1"),
        vec![Status::Running, Status::Complete]
    );
    spec.consumer.disconnect().await.unwrap();
}
