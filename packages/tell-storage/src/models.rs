use serde_json::Value;
use time::OffsetDateTime;

use tell_domain::{event::MemoEventPayload, job::JobStatus, projection::MemoState};

use crate::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Memo {
	pub memo_id: i64,
	pub owner_id: i64,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemoEvent {
	pub event_id: i64,
	pub memo_id: i64,
	pub owner_id: i64,
	pub event_type: String,
	pub payload: Value,
	pub idempotency_key: Option<String>,
	pub created_at: OffsetDateTime,
}
impl MemoEvent {
	pub fn decode_payload(&self) -> Result<MemoEventPayload> {
		Ok(MemoEventPayload::from_json(&self.event_type, &self.payload)?)
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemoProjection {
	pub memo_id: i64,
	pub owner_id: i64,
	pub content: String,
	pub archived: bool,
	pub remind_at: Option<OffsetDateTime>,
	pub tags: Vec<String>,
	pub version: i64,
	pub updated_at: OffsetDateTime,
}
impl MemoProjection {
	pub fn state(&self) -> MemoState {
		MemoState {
			content: self.content.clone(),
			archived: self.archived,
			remind_at: self.remind_at,
			tags: self.tags.clone(),
		}
	}

	pub fn set_state(&mut self, state: MemoState) {
		self.content = state.content;
		self.archived = state.archived;
		self.remind_at = state.remind_at;
		self.tags = state.tags;
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
	pub job_id: i64,
	pub owner_id: i64,
	pub job_type: String,
	pub payload: Value,
	pub due_at: OffsetDateTime,
	pub status: String,
	pub attempts: i32,
	pub max_attempts: i32,
	pub locked_by: Option<String>,
	pub locked_at: Option<OffsetDateTime>,
	pub last_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl Job {
	pub fn job_status(&self) -> Option<JobStatus> {
		JobStatus::parse(&self.status)
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagCount {
	pub tag: String,
	pub count: i64,
}
