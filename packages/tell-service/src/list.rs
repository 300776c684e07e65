use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tell_domain::event::MemoEventPayload;
use tell_storage::{
	jobs,
	memos::{self, ProjectionFilter},
	models::{Job, MemoEvent, MemoProjection},
};

use crate::{Error, Result, TellService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListMemosRequest {
	pub owner_id: i64,
	#[serde(default)]
	pub archived: Option<bool>,
	#[serde(default)]
	pub tag: Option<String>,
	#[serde(default)]
	pub query: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoItem {
	pub memo_id: i64,
	pub content: String,
	pub archived: bool,
	#[serde(with = "crate::time_serde::option")]
	pub remind_at: Option<OffsetDateTime>,
	pub tags: Vec<String>,
	pub version: i64,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<MemoProjection> for MemoItem {
	fn from(projection: MemoProjection) -> Self {
		Self {
			memo_id: projection.memo_id,
			content: projection.content,
			archived: projection.archived,
			remind_at: projection.remind_at,
			tags: projection.tags,
			version: projection.version,
			updated_at: projection.updated_at,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListMemosResponse {
	pub items: Vec<MemoItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEvent {
	pub event_id: i64,
	pub event_type: String,
	pub content: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub remind_at: Option<OffsetDateTime>,
	pub idempotency_key: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}
impl TimelineEvent {
	fn from_event(event: MemoEvent) -> Result<Self> {
		let (content, remind_at) = match event.decode_payload()? {
			MemoEventPayload::Created { content } | MemoEventPayload::Updated { content } =>
				(Some(content), None),
			MemoEventPayload::ReminderSet { remind_at } => (None, Some(remind_at)),
			MemoEventPayload::Archived
			| MemoEventPayload::Restored
			| MemoEventPayload::ReminderCleared => (None, None),
		};

		Ok(Self {
			event_id: event.event_id,
			event_type: event.event_type,
			content,
			remind_at,
			idempotency_key: event.idempotency_key,
			created_at: event.created_at,
		})
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoTimelineResponse {
	pub memo_id: i64,
	pub events: Vec<TimelineEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagStatsRequest {
	pub owner_id: i64,
	#[serde(default)]
	pub prefix: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagStat {
	pub tag: String,
	pub count: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagStatsResponse {
	pub tags: Vec<TagStat>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobItem {
	pub job_id: i64,
	pub status: String,
	#[serde(with = "crate::time_serde")]
	pub due_at: OffsetDateTime,
	pub attempts: i32,
	pub max_attempts: i32,
	pub last_error: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<Job> for JobItem {
	fn from(job: Job) -> Self {
		Self {
			job_id: job.job_id,
			status: job.status,
			due_at: job.due_at,
			attempts: job.attempts,
			max_attempts: job.max_attempts,
			last_error: job.last_error,
			updated_at: job.updated_at,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoJobsResponse {
	pub memo_id: i64,
	pub jobs: Vec<JobItem>,
}

impl TellService {
	pub async fn list_memos(&self, req: ListMemosRequest) -> Result<ListMemosResponse> {
		let limit = crate::clamp_limit(req.limit)?;
		let tag = req
			.tag
			.as_deref()
			.map(|tag| tag.trim().trim_start_matches('#').to_lowercase())
			.filter(|tag| !tag.is_empty());
		let text = req.query.as_deref().map(str::trim).filter(|query| !query.is_empty());
		let filter = ProjectionFilter {
			owner_id: req.owner_id,
			archived: req.archived,
			tag,
			text: text.map(str::to_string),
			limit,
		};
		let projections = memos::list_projections(&self.db.pool, &filter).await?;

		Ok(ListMemosResponse { items: projections.into_iter().map(MemoItem::from).collect() })
	}

	pub async fn get_memo(&self, owner_id: i64, memo_id: i64) -> Result<MemoItem> {
		let projection = memos::fetch_projection(&self.db.pool, memo_id, owner_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Memo not found.".to_string() })?;

		Ok(projection.into())
	}

	/// The memo's full event history in application order.
	pub async fn memo_timeline(&self, owner_id: i64, memo_id: i64) -> Result<MemoTimelineResponse> {
		self.require_memo(owner_id, memo_id).await?;

		let events = memos::list_events(&self.db.pool, memo_id, owner_id)
			.await?
			.into_iter()
			.map(TimelineEvent::from_event)
			.collect::<Result<Vec<_>>>()?;

		Ok(MemoTimelineResponse { memo_id, events })
	}

	pub async fn tag_stats(&self, req: TagStatsRequest) -> Result<TagStatsResponse> {
		let limit = crate::clamp_limit(req.limit)?;
		let prefix = req
			.prefix
			.as_deref()
			.map(|prefix| prefix.trim().trim_start_matches('#').to_lowercase())
			.filter(|prefix| !prefix.is_empty());
		let counts =
			memos::tag_counts(&self.db.pool, req.owner_id, prefix.as_deref(), limit).await?;
		let tags = counts.into_iter().map(|count| TagStat { tag: count.tag, count: count.count });

		Ok(TagStatsResponse { tags: tags.collect() })
	}

	/// Every reminder job of the memo in enqueue order, including terminal ones.
	pub async fn memo_jobs(&self, owner_id: i64, memo_id: i64) -> Result<MemoJobsResponse> {
		self.require_memo(owner_id, memo_id).await?;

		let jobs = jobs::list_memo_jobs(&self.db.pool, owner_id, memo_id).await?;

		Ok(MemoJobsResponse { memo_id, jobs: jobs.into_iter().map(JobItem::from).collect() })
	}

	async fn require_memo(&self, owner_id: i64, memo_id: i64) -> Result<()> {
		match memos::fetch_memo(&self.db.pool, memo_id, owner_id).await? {
			Some(_) => Ok(()),
			None => Err(Error::NotFound { message: "Memo not found.".to_string() }),
		}
	}
}
