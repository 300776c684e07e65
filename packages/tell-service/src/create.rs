use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tell_domain::{event::MemoEventPayload, projection::MemoState};
use tell_storage::{
	memos::{self, NewEvent},
	models::MemoProjection,
};

use crate::{Error, Result, TellService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateMemoRequest {
	pub owner_id: i64,
	pub content: String,
	#[serde(default, with = "crate::time_serde::option")]
	pub remind_at: Option<OffsetDateTime>,
	#[serde(default)]
	pub idempotency_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateMemoResponse {
	pub memo_id: i64,
	pub version: i64,
}

impl TellService {
	/// Creates a memo with its `CREATED` event, projection, and optional reminder in one
	/// transaction.
	///
	/// A reused idempotency key fails with [`Error::Conflict`] and leaves nothing behind.
	pub async fn create_memo(&self, req: CreateMemoRequest) -> Result<CreateMemoResponse> {
		let content = req.content.trim();

		if content.is_empty() {
			return Err(Error::InvalidRequest {
				message: "content must be non-empty.".to_string(),
			});
		}

		let idempotency_key = crate::normalize_idempotency_key(req.idempotency_key.as_deref());
		let now = crate::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let memo_id = memos::insert_memo(&mut *tx, req.owner_id, now).await?;
		let created = MemoEventPayload::Created { content: content.to_string() };

		memos::insert_event(
			&mut *tx,
			&NewEvent { memo_id, owner_id: req.owner_id, payload: &created, idempotency_key, now },
		)
		.await?;

		let mut projection = MemoProjection {
			memo_id,
			owner_id: req.owner_id,
			content: String::new(),
			archived: false,
			remind_at: None,
			tags: Vec::new(),
			version: 0,
			updated_at: now,
		};
		let mut state = MemoState::default();

		state.apply(&created);
		projection.set_state(state.clone());

		memos::insert_projection(&mut *tx, &projection).await?;

		if let Some(remind_at) = req.remind_at {
			let reminder = MemoEventPayload::ReminderSet { remind_at };

			memos::insert_event(
				&mut *tx,
				&NewEvent {
					memo_id,
					owner_id: req.owner_id,
					payload: &reminder,
					idempotency_key: None,
					now,
				},
			)
			.await?;
			state.apply(&reminder);
			projection.set_state(state);
			self.schedule_reminder(&mut tx, req.owner_id, memo_id, remind_at, now).await?;
		}

		projection.version = memos::latest_event_id(&mut *tx, memo_id).await?.ok_or_else(|| {
			Error::Storage { message: format!("Memo {memo_id} has no events after creation.") }
		})?;

		memos::update_projection(&mut *tx, &projection).await?;

		tx.commit().await?;

		tracing::debug!(
			memo_id,
			owner_id = req.owner_id,
			version = projection.version,
			reminder = projection.remind_at.is_some(),
			"Memo created."
		);

		Ok(CreateMemoResponse { memo_id, version: projection.version })
	}
}
