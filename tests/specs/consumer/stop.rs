//! Stop specs
//!
//! Once `stop()` returns no job runs on the consumer: beans submitted later
//! stay on the queue, and a job still being recorded is terminated unrun.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn bean_submitted_after_stop_stays_queued() {
    let spec = Spec::started().await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    spec.consumer.stop().await.unwrap();
    spec.submit("late").await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(spec.factory.created().is_empty());
    assert!(spec.consumer.active_jobs().is_empty());
    let queued: Vec<JobId> = spec
        .consumer
        .submission_queue()
        .await
        .unwrap()
        .into_iter()
        .map(|bean| bean.unique_id)
        .collect();
    assert_eq!(queued, vec![JobId::new("late")]);
    assert_eq!(spec.consumer.join().await, Some(LoopExit::Stopped));
}

#[tokio::test(start_paused = true)]
async fn job_being_recorded_at_stop_is_terminated_unrun() {
    let spec = Spec::started().await;
    spec.broker.delay_upserts(Duration::from_secs(1));
    spec.submit("job-1").await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(spec.factory.created().is_empty());

    spec.consumer.stop().await.unwrap();

    assert!(spec.wait_for_status("job-1", Status::Terminated).await);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(spec.factory.created().is_empty());
    assert!(spec.consumer.active_jobs().is_empty());
    assert_eq!(
        spec.set_statuses("job-1"),
        vec![Status::Queued, Status::Terminated]
    );
}
