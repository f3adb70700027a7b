//! Single-consumer worker loop draining the job queue.

use std::time::Duration;

use crate::models::job::Job;
use crate::queue::{JobQueue, QueueError};
use crate::runner::AuditRunner;
use crate::store::{artifact_filename, report_url, ArtifactStore};

/// Delay between dequeue attempts while the queue is empty.
const IDLE_DELAY: Duration = Duration::from_secs(1);

/// Drains the queue one job at a time for the life of the process.
///
/// Exactly one job is in flight at any moment: a job's audit, artifact
/// write, and terminal transition all finish before the next dequeue.
/// Audits each spin up a full browser, so sequencing matters more than
/// throughput here. Job failures are recorded on the job and never escape
/// the loop.
pub struct Worker<R> {
    queue: JobQueue,
    store: ArtifactStore,
    runner: R,
}

impl<R: AuditRunner> Worker<R> {
    pub fn new(queue: JobQueue, store: ArtifactStore, runner: R) -> Self {
        Self {
            queue,
            store,
            runner,
        }
    }

    /// Runs forever; intended to be spawned beside the HTTP server.
    pub async fn run(self) {
        tracing::info!("worker started");
        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(IDLE_DELAY).await,
                Err(e) => {
                    tracing::error!(error = %e, "queue access failed, backing off");
                    tokio::time::sleep(IDLE_DELAY).await;
                }
            }
        }
    }

    /// Processes at most one job to a terminal state.
    ///
    /// Returns `Ok(false)` when the queue was empty.
    pub async fn tick(&self) -> Result<bool, QueueError> {
        let Some(job) = self.queue.dequeue_next().await? else {
            return Ok(false);
        };
        self.execute(job).await;
        Ok(true)
    }

    async fn execute(&self, job: Job) {
        let filename = artifact_filename(&job.url, job.device_profile, job.submitted_at_ms);
        tracing::info!(job_id = %job.id, url = %job.url, %filename, "job started");

        // The artifact is renamed into place before the completed mark, so
        // the HEAD-probe view never reports a report whose job cannot be
        // observed completing.
        let outcome = match self.runner.run(&job.url, job.device_profile).await {
            Ok(report) => match self.store.write(&filename, &report).await {
                Ok(_) => Ok(report_url(&filename)),
                Err(e) => Err(format!("failed to store report: {e}")),
            },
            Err(e) => Err(format!("audit failed: {e}")),
        };

        let transition = match &outcome {
            Ok(url) => self.queue.mark_completed(job.id, url).await,
            Err(diagnostic) => {
                tracing::warn!(job_id = %job.id, error = %diagnostic, "job failed");
                self.queue.mark_failed(job.id, diagnostic).await
            }
        };

        match transition {
            Ok(()) if outcome.is_ok() => {
                tracing::info!(job_id = %job.id, "job completed");
            }
            Ok(()) => {}
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "terminal transition rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::models::job::{DeviceProfile, JobState};
    use crate::runner::RunnerError;

    /// Runner that replays a scripted sequence of outcomes.
    struct ScriptedRunner {
        outcomes: Mutex<VecDeque<Result<Vec<u8>, RunnerError>>>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<Vec<u8>, RunnerError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    impl AuditRunner for ScriptedRunner {
        async fn run(
            &self,
            _url: &str,
            _profile: DeviceProfile,
        ) -> Result<Vec<u8>, RunnerError> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected audit run")
        }
    }

    async fn test_queue() -> JobQueue {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        JobQueue::new(pool)
    }

    #[tokio::test]
    async fn test_completed_job_agrees_with_predicted_locator() {
        let queue = test_queue().await;
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).await.unwrap();

        let job = queue
            .enqueue("https://example.com", DeviceProfile::Mobile)
            .await
            .unwrap();
        let predicted = artifact_filename(&job.url, job.device_profile, job.submitted_at_ms);

        let worker = Worker::new(
            queue.clone(),
            store.clone(),
            ScriptedRunner::new(vec![Ok(b"<html>report</html>".to_vec())]),
        );
        assert!(worker.tick().await.unwrap());

        let done = queue.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.result.as_deref(), Some(report_url(&predicted).as_str()));
        assert!(store.exists(&predicted).await);
    }

    #[tokio::test]
    async fn test_failed_audit_is_isolated_and_queue_proceeds() {
        let queue = test_queue().await;
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).await.unwrap();

        let doomed = queue
            .enqueue("https://down.example", DeviceProfile::Mobile)
            .await
            .unwrap();
        let healthy = queue
            .enqueue("https://up.example", DeviceProfile::Mobile)
            .await
            .unwrap();

        let worker = Worker::new(
            queue.clone(),
            store.clone(),
            ScriptedRunner::new(vec![
                Err(RunnerError::EmptyReport),
                Ok(b"<html>ok</html>".to_vec()),
            ]),
        );

        assert!(worker.tick().await.unwrap());

        let failed = queue.get_by_id(doomed.id).await.unwrap().unwrap();
        assert_eq!(failed.state, JobState::Failed);
        assert!(failed.error.is_some());
        let doomed_name =
            artifact_filename(&doomed.url, doomed.device_profile, doomed.submitted_at_ms);
        assert!(!store.exists(&doomed_name).await);

        // The failure did not wedge the loop; the next job runs to completion.
        assert!(worker.tick().await.unwrap());
        let done = queue.get_by_id(healthy.id).await.unwrap().unwrap();
        assert_eq!(done.state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_tick_returns_false_on_empty_queue() {
        let queue = test_queue().await;
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).await.unwrap();

        let worker = Worker::new(queue, store, ScriptedRunner::new(vec![]));
        assert!(!worker.tick().await.unwrap());
    }
}
