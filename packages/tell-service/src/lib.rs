pub mod append;
pub mod create;
pub mod list;
pub mod rebuild;
pub mod time_serde;

mod error;

pub use append::{AppendEventRequest, AppendEventResponse};
pub use create::{CreateMemoRequest, CreateMemoResponse};
pub use error::{Error, Result};
pub use list::{
	JobItem, ListMemosRequest, ListMemosResponse, MemoItem, MemoJobsResponse, MemoTimelineResponse,
	TagStat, TagStatsRequest, TagStatsResponse, TimelineEvent,
};
pub use rebuild::RebuildProjectionResponse;

use time::{Duration, OffsetDateTime};

use tell_config::Config;
use tell_domain::job::JobPayload;
use tell_storage::{
	db::Db,
	jobs::{self, NewJob},
};

pub struct TellService {
	pub cfg: Config,
	pub db: Db,
}
impl TellService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db }
	}

	/// Replaces any still-pending reminder for the memo with one due at `remind_at`.
	pub(crate) async fn schedule_reminder(
		&self,
		tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
		owner_id: i64,
		memo_id: i64,
		remind_at: OffsetDateTime,
		now: OffsetDateTime,
	) -> Result<i64> {
		jobs::cancel_pending_reminders(&mut **tx, owner_id, memo_id, now).await?;

		let job_id = jobs::enqueue_job(
			&mut **tx,
			&NewJob {
				owner_id,
				payload: JobPayload::reminder(memo_id),
				due_at: remind_at,
				max_attempts: self.cfg.scheduler.max_attempts,
				now,
			},
		)
		.await?;

		Ok(job_id)
	}
}

pub(crate) fn normalize_idempotency_key(raw: Option<&str>) -> Option<&str> {
	raw.map(str::trim).filter(|key| !key.is_empty())
}

/// Applies the read default and ceiling to a caller-supplied page size.
pub(crate) fn clamp_limit(limit: Option<u32>) -> Result<i64> {
	const DEFAULT_LIMIT: u32 = 50;
	const MAX_LIMIT: u32 = 200;

	match limit {
		Some(0) =>
			Err(Error::InvalidRequest { message: "limit must be greater than zero.".to_string() }),
		Some(limit) => Ok(i64::from(limit.min(MAX_LIMIT))),
		None => Ok(i64::from(DEFAULT_LIMIT)),
	}
}

// Timestamps are stored with microsecond precision, so keep in-memory values comparable.
pub(crate) fn now_utc() -> OffsetDateTime {
	let now = OffsetDateTime::now_utc();

	now - Duration::nanoseconds(i64::from(now.nanosecond() % 1_000))
}
