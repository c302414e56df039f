//! Subscription loop
//!
//! Long-polls the engine, processes each delivered task on its own tokio task
//! and reports the resolution back. A panic while processing one task is
//! contained at the join boundary and reported as a failure.

use crate::config::WorkerSection;
use crate::consignment::ConsignmentApi;
use crate::engine::{ExternalTask, TaskQueue};
use crate::error::WorkerResult;
use crate::observability::metrics::metrics;
use crate::processing::{report_resolution, TaskProcessor, TaskResolution, UNEXPECTED_ERROR};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn, Instrument};

/// Cloneable trigger for stopping a running [`Worker`]
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // send_replace never fails, even with no receiver subscribed yet
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Engine subscription worker
pub struct Worker<Q: TaskQueue, C: ConsignmentApi> {
    queue: Arc<Q>,
    processor: Arc<TaskProcessor<C>>,
    max_tasks: u32,
    fetch_backoff: Duration,
    shutdown: ShutdownHandle,
}

impl<Q, C> Worker<Q, C>
where
    Q: TaskQueue + 'static,
    C: ConsignmentApi + 'static,
{
    pub fn new(queue: Arc<Q>, processor: TaskProcessor<C>, config: &WorkerSection) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            queue,
            processor: Arc::new(processor),
            max_tasks: config.max_tasks.max(1),
            fetch_backoff: config.fetch_backoff(),
            shutdown: ShutdownHandle { tx: Arc::new(tx) },
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Poll until shutdown is requested
    ///
    /// Tasks of the batch in progress are finished before returning.
    pub async fn run(&self) -> WorkerResult<()> {
        let mut shutdown_rx = self.shutdown.tx.subscribe();
        metrics().set_worker_state("running");
        info!(max_tasks = self.max_tasks, "Worker started polling for tasks");

        loop {
            if self.shutdown.is_shutdown() {
                break;
            }

            let fetched = tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.queue.fetch_and_lock(self.max_tasks) => result,
            };

            match fetched {
                Ok(tasks) => {
                    metrics().fetch_completed(tasks.len());
                    if !tasks.is_empty() {
                        debug!(count = tasks.len(), "Processing fetched tasks");
                        self.handle_batch(tasks).await;
                    }
                }
                Err(e) => {
                    metrics().fetch_failed();
                    warn!(
                        error = %e,
                        backoff_ms = self.fetch_backoff.as_millis() as u64,
                        "Failed to fetch tasks from engine"
                    );
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(self.fetch_backoff) => {}
                    }
                }
            }
        }

        metrics().set_worker_state("stopped");
        info!("Worker stopped");
        Ok(())
    }

    async fn handle_batch(&self, tasks: Vec<ExternalTask>) {
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let queue = Arc::clone(&self.queue);
                let processor = Arc::clone(&self.processor);
                tokio::spawn(handle_task(queue, processor, task))
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Task handler aborted");
            }
        }
    }
}

/// Process one task and report its resolution
async fn handle_task<Q, C>(queue: Arc<Q>, processor: Arc<TaskProcessor<C>>, task: ExternalTask)
where
    Q: TaskQueue + 'static,
    C: ConsignmentApi + 'static,
{
    let started = Instant::now();
    let run = {
        let processor = Arc::clone(&processor);
        let task = task.clone();
        tokio::spawn(async move { processor.process(&task).await })
    };

    let resolution = match run.await {
        Ok(resolution) => resolution,
        Err(join_error) => {
            let detail = join_error_detail(join_error);
            metrics().task_panicked();
            metrics().task_failure_reported(started.elapsed());
            error!(task_id = %task.id, %detail, "Task processing panicked");
            TaskResolution::Failure(processor.failure_report(&task, UNEXPECTED_ERROR, &detail))
        }
    };

    let report_span = crate::engine_span!(operation = "report", task_id = %task.id);
    if let Err(e) = report_resolution(queue.as_ref(), &task, &resolution)
        .instrument(report_span)
        .await
    {
        metrics().report_failed();
        error!(
            task_id = %task.id,
            error = %e,
            "Engine rejected task report; lock will expire and the task will be redelivered"
        );
    }
}

fn join_error_detail(join_error: JoinError) -> String {
    if join_error.is_cancelled() {
        return "task processing was cancelled".to_string();
    }

    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::testing::mocks::{MockConsignmentApi, MockTaskQueue};
    use crate::testing::task_with;
    use serde_json::json;
    use tokio::time::timeout;

    fn config() -> WorkerSection {
        WorkerSection {
            fetch_backoff_ms: 20,
            ..Default::default()
        }
    }

    fn valid_task(id: &str) -> ExternalTask {
        task_with(
            id,
            None,
            &[
                ("order_nr", json!("A1")),
                ("weight", json!(5)),
                ("delivery_address", json!("Street 1")),
                ("phone", json!("+49123456789")),
            ],
        )
    }

    async fn run_until<F>(worker: &Worker<MockTaskQueue, MockConsignmentApi>, done: F)
    where
        F: Fn() -> bool,
    {
        let handle = worker.shutdown_handle();
        let run = worker.run();
        tokio::pin!(run);

        let result = timeout(Duration::from_secs(5), async {
            loop {
                tokio::select! {
                    result = &mut run => return result,
                    _ = tokio::time::sleep(Duration::from_millis(5)) => {
                        if done() {
                            handle.shutdown();
                        }
                    }
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(Ok(()))), "worker did not stop cleanly");
    }

    #[tokio::test]
    async fn test_processes_batch_and_reports() {
        let queue = Arc::new(MockTaskQueue::new());
        queue.push_batch(vec![valid_task("t1"), valid_task("t2")]);

        let api = MockConsignmentApi::new().respond(200, r#"{"orderId":"X1"}"#);
        let worker = Worker::new(Arc::clone(&queue), TaskProcessor::new(api), &config());

        run_until(&worker, || queue.resolved_count() == 2).await;

        let mut completed: Vec<_> = queue.completions().into_iter().map(|(id, _)| id).collect();
        completed.sort();
        assert_eq!(completed, vec!["t1", "t2"]);
        assert!(queue.failures().is_empty());
    }

    #[tokio::test]
    async fn test_panic_becomes_failure_report() {
        let queue = Arc::new(MockTaskQueue::new());
        queue.push_batch(vec![valid_task("t-panic")]);

        let api = MockConsignmentApi::new().panic_with("boom");
        let worker = Worker::new(Arc::clone(&queue), TaskProcessor::new(api), &config());

        run_until(&worker, || queue.resolved_count() == 1).await;

        let failures = queue.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "t-panic");
        assert_eq!(failures[0].1.error_message, UNEXPECTED_ERROR);
        assert!(failures[0].1.error_details.contains("boom"));
        assert_eq!(failures[0].1.retries, 2);
    }

    #[tokio::test]
    async fn test_fetch_error_backs_off_and_recovers() {
        let queue = Arc::new(MockTaskQueue::new());
        queue.push_fetch_error(EngineError::Request("connection refused".to_string()));
        queue.push_batch(vec![valid_task("t1")]);

        let api = MockConsignmentApi::new().respond(202, "{}");
        let worker = Worker::new(Arc::clone(&queue), TaskProcessor::new(api), &config());

        run_until(&worker, || queue.resolved_count() == 1).await;

        assert!(queue.fetch_count() >= 2);
        assert_eq!(queue.completions().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_report_does_not_stop_worker() {
        let queue = Arc::new(MockTaskQueue::with_failing_reports());
        queue.push_batch(vec![valid_task("t1")]);

        let api = MockConsignmentApi::new().respond(200, "{}");
        let worker = Worker::new(Arc::clone(&queue), TaskProcessor::new(api), &config());

        run_until(&worker, || queue.fetch_count() >= 3).await;
        assert_eq!(queue.resolved_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_run_returns_immediately() {
        let queue = Arc::new(MockTaskQueue::new());
        let worker = Worker::new(
            Arc::clone(&queue),
            TaskProcessor::new(MockConsignmentApi::new()),
            &config(),
        );

        let handle = worker.shutdown_handle();
        handle.shutdown();
        assert!(handle.is_shutdown());

        timeout(Duration::from_secs(1), worker.run())
            .await
            .expect("worker should stop")
            .unwrap();
        assert_eq!(queue.fetch_count(), 0);
    }

    #[test]
    fn test_join_error_detail_for_string_panics() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let detail = runtime.block_on(async {
            let err = tokio::spawn(async { panic!("{}", String::from("owned boom")) })
                .await
                .unwrap_err();
            join_error_detail(err)
        });
        assert_eq!(detail, "panic: owned boom");
    }
}
