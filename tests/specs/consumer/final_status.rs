//! Final status specs
//!
//! Once a bean reaches a final status nothing more is published for it.

use crate::prelude::*;
use async_trait::async_trait;
use bq_engine::{Broadcast, ConsumerProcess, ProcessError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Completes, then keeps trying to report progress
struct ChattyProcess {
    bean: Mutex<JobBean>,
    publisher: Arc<dyn Broadcast>,
    late_updates_rejected: Arc<Mutex<usize>>,
}

#[async_trait]
impl ConsumerProcess for ChattyProcess {
    fn bean(&self) -> JobBean {
        self.bean.lock().clone()
    }

    async fn execute(&self) -> Result<(), ProcessError> {
        for status in [Status::Running, Status::Complete] {
            let snapshot = {
                let mut bean = self.bean.lock();
                bean.set_status(status)?;
                bean.clone()
            };
            self.publisher.broadcast(&snapshot).await?;
        }

        // A stale copy that still thinks it is running
        let mut stale = JobBean::with_id(self.bean().unique_id, "stale");
        stale.set_status(Status::Queued)?;
        stale.set_status(Status::Running)?;
        for _ in 0..3 {
            if self.publisher.broadcast(&stale).await.is_err() {
                *self.late_updates_rejected.lock() += 1;
            }
        }
        Ok(())
    }

    async fn terminate(&self) -> Result<(), ProcessError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn no_transition_after_final_status() {
    let broker = FakeBroker::new();
    let consumer = Consumer::new(broker.clone(), JsonConnector, FakeClock::new(), spec_config());
    let rejected = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&rejected);
    consumer
        .set_runner(
            move |bean: JobBean, publisher: Arc<dyn Broadcast>| -> Result<Arc<dyn ConsumerProcess>, ProcessError> {
                Ok(Arc::new(ChattyProcess {
                    bean: Mutex::new(bean),
                    publisher,
                    late_updates_rejected: Arc::clone(&counter),
                }))
            },
        )
        .unwrap();
    consumer.start().await.unwrap();
    consumer.submit(submitted_bean("job-1")).await.unwrap();

    assert!(wait_until(SPEC_WAIT_MAX, || *rejected.lock() == 3).await);

    let statuses: Vec<Status> = broker
        .published(&consumer.names().status_topic)
        .iter()
        .map(|payload| JsonConnector.unmarshal::<JobBean>(payload).unwrap().status())
        .collect();
    assert_eq!(statuses, vec![Status::Running, Status::Complete]);
    consumer.disconnect().await.unwrap();
}
