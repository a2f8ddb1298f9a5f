//! End-to-end execution specs
//!
//! A submitted bean is picked up, recorded before it runs, and finishes
//! with a final broadcast.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn submitted_bean_runs_to_complete() {
    let spec = Spec::started().await;
    spec.submit("job-1").await;

    let process = spec.running("job-1").await;
    // Recorded as QUEUED, then RUNNING, before any execution logic finishes
    assert_eq!(
        spec.set_statuses("job-1"),
        vec![Status::Queued, Status::Running]
    );

    process.release();
    assert!(spec.wait_for_status("job-1", Status::Complete).await);

    let last = spec.topic_beans("job-1").pop().unwrap();
    assert_eq!(last.status(), Status::Complete);
    assert_eq!(last.percent_complete(), 100.0);
    assert!(wait_until(SPEC_WAIT_MAX, || spec.consumer.active_jobs().is_empty()).await);

    spec.consumer.disconnect().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn jobs_run_concurrently() {
    let spec = Spec::started().await;
    spec.submit("job-1").await;
    spec.submit("job-2").await;

    let first = spec.running("job-1").await;
    let second = spec.running("job-2").await;
    assert_eq!(
        spec.consumer.active_jobs(),
        vec![JobId::new("job-1"), JobId::new("job-2")]
    );

    second.release();
    first.release();
    assert!(spec.wait_for_status("job-1", Status::Complete).await);
    assert!(spec.wait_for_status("job-2", Status::Complete).await);
    spec.consumer.disconnect().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_runner_marks_job_failed() {
    let spec = Spec::started().await;
    spec.factory.fail_execute("detector offline");
    spec.submit("job-1").await;

    spec.running("job-1").await.release();
    assert!(spec.wait_for_status("job-1", Status::Failed).await);

    let failed = spec.topic_beans("job-1").pop().unwrap();
    assert!(failed.message.as_deref().unwrap_or_default().contains("detector offline"));
    spec.consumer.disconnect().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn undecodable_submission_is_skipped() {
    let spec = Spec::started().await;
    spec.broker
        .submit(&spec.consumer.names().submission_queue, "{not json".to_string())
        .await
        .unwrap();
    spec.submit("job-1").await;

    spec.running("job-1").await.release();
    assert!(spec.wait_for_status("job-1", Status::Complete).await);
    assert_eq!(spec.factory.created(), vec![JobId::new("job-1")]);
    spec.consumer.disconnect().await.unwrap();
}
