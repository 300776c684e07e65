use sqlx::PgExecutor;
use time::{Duration, OffsetDateTime};

use tell_domain::job::{self, JobPayload};

use crate::{Result, db::Db, models::Job};

pub const MAX_JOB_ERROR_CHARS: usize = 1_024;

const JOB_COLUMNS: &str = "\
job_id,
	owner_id,
	job_type,
	payload,
	due_at,
	status,
	attempts,
	max_attempts,
	locked_by,
	locked_at,
	last_error,
	created_at,
	updated_at";

/// Result of one claim attempt.
#[derive(Debug)]
pub struct Claim {
	pub job: Option<Job>,
	/// Stale leases returned to `PENDING` before the claim.
	pub requeued: u64,
}

pub struct NewJob {
	pub owner_id: i64,
	pub payload: JobPayload,
	pub due_at: OffsetDateTime,
	pub max_attempts: i32,
	pub now: OffsetDateTime,
}

pub async fn enqueue_job<'e, E>(executor: E, job: &NewJob) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	if job.max_attempts <= 0 {
		return Err(crate::Error::InvalidArgument(
			"max_attempts must be greater than zero.".to_string(),
		));
	}

	let payload = job.payload.to_json()?;
	let job_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO jobs (owner_id, job_type, payload, due_at, status, attempts, max_attempts, created_at, updated_at)
VALUES ($1, $2, $3, $4, 'PENDING', 0, $5, $6, $6)
RETURNING job_id",
	)
	.bind(job.owner_id)
	.bind(job.payload.job_type())
	.bind(payload)
	.bind(job.due_at)
	.bind(job.max_attempts)
	.bind(job.now)
	.fetch_one(executor)
	.await?;

	Ok(job_id)
}

/// Marks the memo's still-pending reminder jobs `CANCELLED` and returns how many were touched.
///
/// Jobs already claimed are left alone; their handler sees the newer projection state.
pub async fn cancel_pending_reminders<'e, E>(
	executor: E,
	owner_id: i64,
	memo_id: i64,
	now: OffsetDateTime,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'CANCELLED', updated_at = $1
WHERE status = 'PENDING'
	AND job_type = $2
	AND owner_id = $3
	AND (payload->>'memo_id')::bigint = $4",
	)
	.bind(now)
	.bind(job::REMINDER_DISPATCH)
	.bind(owner_id)
	.bind(memo_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Returns every `RUNNING` job whose lease started before `now - lease_timeout` to `PENDING`.
pub async fn requeue_stale_leases<'e, E>(
	executor: E,
	now: OffsetDateTime,
	lease_timeout: Duration,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'PENDING', locked_by = NULL, locked_at = NULL, updated_at = $1
WHERE job_id IN (
	SELECT job_id
	FROM jobs
	WHERE status = 'RUNNING' AND locked_at < $2
	FOR UPDATE SKIP LOCKED
)",
	)
	.bind(now)
	.bind(now - lease_timeout)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

/// Claims the earliest due pending job for `worker_id`, recovering stale leases first.
///
/// Rows locked by a concurrent claim are skipped, so two workers never receive the same job.
pub async fn claim_next_job(
	db: &Db,
	worker_id: &str,
	now: OffsetDateTime,
	lease_timeout: Duration,
) -> Result<Claim> {
	let mut tx = db.pool.begin().await?;
	let requeued = requeue_stale_leases(&mut *tx, now, lease_timeout).await?;

	let job_id: Option<i64> = sqlx::query_scalar(
		"\
SELECT job_id
FROM jobs
WHERE status = 'PENDING' AND due_at <= $1
ORDER BY due_at ASC, job_id ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = match job_id {
		Some(job_id) => {
			let job = sqlx::query_as::<_, Job>(&format!(
				"\
UPDATE jobs
SET status = 'RUNNING', locked_by = $1, locked_at = $2, updated_at = $2
WHERE job_id = $3
RETURNING {JOB_COLUMNS}"
			))
			.bind(worker_id)
			.bind(now)
			.bind(job_id)
			.fetch_one(&mut *tx)
			.await?;

			Some(job)
		},
		None => None,
	};

	tx.commit().await?;

	Ok(Claim { job, requeued })
}

/// Returns `false` when `worker_id` no longer holds the lease and the job is not already done.
pub async fn mark_done(db: &Db, job_id: i64, worker_id: &str, now: OffsetDateTime) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'DONE', locked_by = NULL, locked_at = NULL, updated_at = $1
WHERE job_id = $2 AND ((status = 'RUNNING' AND locked_by = $3) OR status = 'DONE')",
	)
	.bind(now)
	.bind(job_id)
	.bind(worker_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Only applies while `worker_id` still holds the lease.
pub async fn mark_failed(
	db: &Db,
	job_id: i64,
	worker_id: &str,
	attempts: i32,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	locked_by = NULL,
	locked_at = NULL,
	updated_at = $3
WHERE job_id = $4 AND status = 'RUNNING' AND locked_by = $5",
	)
	.bind(attempts)
	.bind(truncate_error(error_text))
	.bind(now)
	.bind(job_id)
	.bind(worker_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Only applies while `worker_id` still holds the lease.
pub async fn retry_later(
	db: &Db,
	job_id: i64,
	worker_id: &str,
	attempts: i32,
	due_at: OffsetDateTime,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE jobs
SET status = 'PENDING',
	attempts = $1,
	due_at = $2,
	last_error = $3,
	locked_by = NULL,
	locked_at = NULL,
	updated_at = $4
WHERE job_id = $5 AND status = 'RUNNING' AND locked_by = $6",
	)
	.bind(attempts)
	.bind(due_at)
	.bind(truncate_error(error_text))
	.bind(now)
	.bind(job_id)
	.bind(worker_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn fetch_job<'e, E>(executor: E, job_id: i64) -> Result<Option<Job>>
where
	E: PgExecutor<'e>,
{
	let job = sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = $1"))
		.bind(job_id)
		.fetch_optional(executor)
		.await?;

	Ok(job)
}

/// Every reminder job ever enqueued for the memo, oldest first.
pub async fn list_memo_jobs<'e, E>(executor: E, owner_id: i64, memo_id: i64) -> Result<Vec<Job>>
where
	E: PgExecutor<'e>,
{
	let jobs = sqlx::query_as::<_, Job>(&format!(
		"\
SELECT {JOB_COLUMNS}
FROM jobs
WHERE owner_id = $1 AND job_type = $2 AND (payload->>'memo_id')::bigint = $3
ORDER BY job_id ASC"
	))
	.bind(owner_id)
	.bind(job::REMINDER_DISPATCH)
	.bind(memo_id)
	.fetch_all(executor)
	.await?;

	Ok(jobs)
}

fn truncate_error(error_text: &str) -> String {
	match error_text.char_indices().nth(MAX_JOB_ERROR_CHARS) {
		Some((idx, _)) => error_text[..idx].to_string(),
		None => error_text.to_string(),
	}
}
