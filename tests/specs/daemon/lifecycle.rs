//! Daemon lifecycle specs
//!
//! The daemon's consumer runs simulated jobs over an on-disk spool that
//! other processes can write to.

use crate::prelude::*;
use bq_adapters::SpoolBroker;
use bq_core::SystemClock;
use bq_daemon::{startup, Config, SimulationConfig};
use bq_engine::Submitter;
use std::time::Duration;

fn daemon_config(dir: &std::path::Path) -> Config {
    let mut config = Config::load_from(dir.to_path_buf()).unwrap();
    config.queue_root = "spec".to_string();
    config.poll_timeout = Duration::from_millis(50);
    config.heartbeat_interval = Duration::from_millis(50);
    config.simulation = SimulationConfig {
        steps: 2,
        step_interval: Duration::from_millis(10),
    };
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn daemon_runs_jobs_from_the_spool() {
    let dir = tempfile::tempdir().unwrap();
    let config = daemon_config(dir.path());
    let daemon = startup(&config).await.unwrap();

    let spool = SpoolBroker::from_uri(&config.broker_uri).unwrap();
    let submitter = Submitter::new(spool.clone(), JsonConnector, SystemClock, "spec");
    submitter.submit(submitted_bean("job-1")).await.unwrap();

    let status_set = submitter.names().status_set.clone();
    let mut finished = None;
    for _ in 0..200 {
        let beans: Vec<JobBean> = spool
            .set_entries(&status_set)
            .await
            .unwrap()
            .iter()
            .map(|entry| JsonConnector.unmarshal(entry).unwrap())
            .collect();
        if let Some(bean) = beans.into_iter().find(|bean| bean.is_final()) {
            finished = Some(bean);
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let finished = finished.expect("job never finished");
    assert_eq!(finished.status(), Status::Complete);
    assert_eq!(finished.percent_complete(), 100.0);

    daemon.shutdown().await;
    assert!(!config.lock_path.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn kill_with_exit_surfaces_as_shutdown_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = daemon_config(dir.path());
    config.consumer_name = "exit-on-kill".to_string();
    let daemon = startup(&config).await.unwrap();
    let mut requests = daemon.consumer.shutdown_requests();

    let spool = SpoolBroker::from_uri(&config.broker_uri).unwrap();
    let submitter = Submitter::new(spool, JsonConnector, SystemClock, "spec");
    submitter
        .kill(&kill_bean(daemon.consumer.consumer_id(), false, true))
        .await
        .unwrap();

    let request = *tokio::time::timeout(Duration::from_secs(10), requests.wait_for(Option::is_some))
        .await
        .expect("no shutdown request")
        .unwrap();
    assert_eq!(request, Some(ShutdownRequest::Exit));
    assert_eq!(bq_daemon::exit_code(ShutdownRequest::Exit), 0);

    daemon.shutdown().await;
}
