//! Durable FIFO job queue over SQLite.
//!
//! The queue is an explicit store constructed once at startup from the
//! connection pool; all state lives in the `jobs` table and survives
//! process restarts.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::job::{DeviceProfile, Job, JobState};

/// Columns selected whenever a full [`Job`] row is returned.
const JOB_COLUMNS: &str = "id, url, device_profile, submitted_at_ms, state, result, error";

/// Errors from queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A terminal mark was attempted on a job that is missing or not
    /// currently active. Guards against double completion.
    #[error("job {id} is not active; refusing transition to {attempted}")]
    InvalidTransition { id: Uuid, attempted: &'static str },
}

/// Durable, ordered holding area for audit jobs.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Debug, Clone)]
pub struct JobQueue {
    pool: SqlitePool,
}

impl JobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a job in state `queued`, assigns its id and submission
    /// timestamp, and persists it. Never blocks on execution.
    pub async fn enqueue(
        &self,
        url: &str,
        device_profile: DeviceProfile,
    ) -> Result<Job, QueueError> {
        let job = Job {
            id: Uuid::new_v4(),
            url: url.to_string(),
            device_profile,
            submitted_at_ms: chrono::Utc::now().timestamp_millis(),
            state: JobState::Queued,
            result: None,
            error: None,
        };

        sqlx::query(
            "INSERT INTO jobs (id, url, device_profile, submitted_at_ms, state) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(job.id)
        .bind(&job.url)
        .bind(job.device_profile)
        .bind(job.submitted_at_ms)
        .bind(job.state)
        .execute(&self.pool)
        .await?;

        Ok(job)
    }

    /// Claims the oldest `queued` job, marking it `active`, or returns
    /// `None` when nothing is pending.
    ///
    /// The claim and the state transition are a single `UPDATE`, so no two
    /// callers can ever observe the same job as claimable.
    pub async fn dequeue_next(&self) -> Result<Option<Job>, QueueError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "UPDATE jobs SET state = 'active' \
             WHERE id = (SELECT id FROM jobs WHERE state = 'queued' \
                         ORDER BY submitted_at_ms ASC, rowid ASC LIMIT 1) \
             RETURNING {JOB_COLUMNS}"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Read-only lookup by job id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Job>, QueueError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Marks an active job completed, recording its report URL.
    pub async fn mark_completed(&self, id: Uuid, result: &str) -> Result<(), QueueError> {
        self.mark_terminal(id, "completed", Some(result), None).await
    }

    /// Marks an active job failed, recording a diagnostic message.
    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), QueueError> {
        self.mark_terminal(id, "failed", None, Some(error)).await
    }

    async fn mark_terminal(
        &self,
        id: Uuid,
        state: &'static str,
        result: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), QueueError> {
        // The `state = 'active'` predicate enforces the transition guard.
        let done = sqlx::query(
            "UPDATE jobs SET state = ?, result = ?, error = ? \
             WHERE id = ? AND state = 'active'",
        )
        .bind(state)
        .bind(result)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(QueueError::InvalidTransition {
                id,
                attempted: state,
            });
        }

        Ok(())
    }
}
