use std::{future::Future, pin::Pin, sync::Arc, time::Duration as StdDuration};

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::{sync::watch, time as tokio_time};

use tell_domain::job::{self, JobPayload, JobStatus, ReminderDispatch, RetryDecision};
use tell_storage::{
	db::Db,
	jobs, memos,
	models::{Job, MemoProjection},
};

use crate::HandlerError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Delivers a due reminder. Failures are retried through the backoff policy.
pub trait ReminderDispatcher
where
	Self: Send + Sync,
{
	fn dispatch<'a>(&'a self, job: &'a Job, memo: &'a MemoProjection) -> BoxFuture<'a, Result<()>>;
}

/// Emits each reminder as a structured log event.
pub struct LogDispatcher;
impl ReminderDispatcher for LogDispatcher {
	fn dispatch<'a>(&'a self, job: &'a Job, memo: &'a MemoProjection) -> BoxFuture<'a, Result<()>> {
		tracing::info!(
			job_id = job.job_id,
			memo_id = memo.memo_id,
			owner_id = memo.owner_id,
			remind_at = ?memo.remind_at,
			content = %memo.content,
			"Reminder dispatched."
		);

		Box::pin(async { Ok(()) })
	}
}

pub struct WorkerState {
	pub db: Db,
	pub worker_id: String,
	pub scheduler: tell_config::Scheduler,
	pub dispatcher: Arc<dyn ReminderDispatcher>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
	pub job_id: i64,
	pub status: JobStatus,
}

/// Polls until `shutdown` flips, handling at most one job per tick.
pub async fn run_worker(state: WorkerState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
	let interval = StdDuration::from_millis(state.scheduler.poll_interval_ms);

	tracing::info!(worker_id = %state.worker_id, "Worker loop started.");

	while !*shutdown.borrow() {
		match process_once(&state, OffsetDateTime::now_utc()).await {
			Ok(Some(outcome)) => tracing::info!(
				worker_id = %state.worker_id,
				job_id = outcome.job_id,
				status = %outcome.status,
				"Job processed."
			),
			Ok(None) => {},
			Err(err) => {
				tracing::error!(
					error = %err,
					worker_id = %state.worker_id,
					"Job processing failed."
				);
			},
		}

		tokio::select! {
			_ = tokio_time::sleep(interval) => {},
			changed = shutdown.changed() => {
				if changed.is_err() {
					break;
				}
			},
		}
	}

	tracing::info!(worker_id = %state.worker_id, "Worker loop stopped.");

	Ok(())
}

/// Claims one due job as of `now`, runs it, and records the resulting status.
///
/// Returns `None` when no job was eligible.
pub async fn process_once(state: &WorkerState, now: OffsetDateTime) -> Result<Option<JobOutcome>> {
	let lease_timeout = Duration::seconds(state.scheduler.lease_timeout_seconds);
	let claim = jobs::claim_next_job(&state.db, &state.worker_id, now, lease_timeout).await?;

	if claim.requeued > 0 {
		tracing::warn!(
			worker_id = %state.worker_id,
			requeued = claim.requeued,
			"Recovered jobs with expired leases."
		);
	}

	let Some(job) = claim.job else {
		return Ok(None);
	};

	tracing::debug!(
		worker_id = %state.worker_id,
		job_id = job.job_id,
		job_type = %job.job_type,
		attempts = job.attempts,
		"Job claimed."
	);

	let status = match handle_job(state, &job).await {
		Ok(()) => {
			let updated = jobs::mark_done(&state.db, job.job_id, &state.worker_id, now).await?;

			warn_if_lease_lost(state, &job, updated);

			JobStatus::Done
		},
		Err(HandlerError::Fatal(message)) => {
			let attempts = job.attempts.saturating_add(1);
			let updated =
				jobs::mark_failed(&state.db, job.job_id, &state.worker_id, attempts, &message, now)
					.await?;

			warn_if_lease_lost(state, &job, updated);
			tracing::error!(job_id = job.job_id, error = %message, "Job failed permanently.");

			JobStatus::Failed
		},
		Err(HandlerError::Retryable(message)) => {
			let cap = Duration::seconds(state.scheduler.backoff_cap_seconds);

			match job::retry_decision(job.attempts, job.max_attempts, now, cap) {
				RetryDecision::Retry { attempts, due_at } => {
					let updated = jobs::retry_later(
						&state.db,
						job.job_id,
						&state.worker_id,
						attempts,
						due_at,
						&message,
						now,
					)
					.await?;

					warn_if_lease_lost(state, &job, updated);
					tracing::warn!(
						job_id = job.job_id,
						attempts,
						due_at = %due_at,
						error = %message,
						"Job failed. Retrying later."
					);

					JobStatus::Pending
				},
				RetryDecision::Fail { attempts } => {
					let updated = jobs::mark_failed(
						&state.db,
						job.job_id,
						&state.worker_id,
						attempts,
						&message,
						now,
					)
					.await?;

					warn_if_lease_lost(state, &job, updated);
					tracing::error!(
						job_id = job.job_id,
						attempts,
						error = %message,
						"Job exhausted its attempts."
					);

					JobStatus::Failed
				},
			}
		},
	};

	Ok(Some(JobOutcome { job_id: job.job_id, status }))
}

async fn handle_job(state: &WorkerState, job: &Job) -> Result<(), HandlerError> {
	let payload = JobPayload::decode(&job.job_type, &job.payload)
		.map_err(|err| HandlerError::Fatal(err.to_string()))?;

	match payload {
		JobPayload::ReminderDispatch(reminder) => dispatch_reminder(state, job, reminder).await,
	}
}

async fn dispatch_reminder(
	state: &WorkerState,
	job: &Job,
	reminder: ReminderDispatch,
) -> Result<(), HandlerError> {
	let Some(memo) = memos::fetch_projection(&state.db.pool, reminder.memo_id, job.owner_id).await?
	else {
		tracing::info!(memo_id = reminder.memo_id, "Memo missing for reminder job. Marking done.");

		return Ok(());
	};

	if memo.archived || memo.remind_at.is_none() {
		tracing::info!(memo_id = memo.memo_id, "Reminder superseded. Marking done.");

		return Ok(());
	}

	state
		.dispatcher
		.dispatch(job, &memo)
		.await
		.map_err(|err| HandlerError::Retryable(format!("Reminder dispatch failed: {err}")))
}

fn warn_if_lease_lost(state: &WorkerState, job: &Job, updated: bool) {
	if !updated {
		tracing::warn!(
			worker_id = %state.worker_id,
			job_id = job.job_id,
			"Job was no longer held by this worker when its result was recorded."
		);
	}
}
