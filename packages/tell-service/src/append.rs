use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use tell_domain::event::MemoEventPayload;
use tell_storage::{
	jobs,
	memos::{self, NewEvent},
};

use crate::{Error, Result, TellService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppendEventRequest {
	pub owner_id: i64,
	pub memo_id: i64,
	pub event_type: String,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default, with = "crate::time_serde::option")]
	pub remind_at: Option<OffsetDateTime>,
	#[serde(default)]
	pub idempotency_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppendEventResponse {
	pub memo_id: i64,
	pub event_id: i64,
	pub version: i64,
}

impl TellService {
	/// Appends one event and folds it into the projection, cancelling or rescheduling the memo's
	/// pending reminder when the event touches it.
	///
	/// Appends for one memo serialize on the projection row lock, which is taken before the event
	/// is inserted so event ids follow application order.
	pub async fn append_event(&self, req: AppendEventRequest) -> Result<AppendEventResponse> {
		let idempotency_key = crate::normalize_idempotency_key(req.idempotency_key.as_deref());
		let now = crate::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let mut projection = memos::lock_projection(&mut *tx, req.memo_id, req.owner_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Memo not found.".to_string() })?;
		let payload =
			MemoEventPayload::for_append(&req.event_type, req.content.as_deref(), req.remind_at)?;
		let event_id = memos::insert_event(
			&mut *tx,
			&NewEvent {
				memo_id: req.memo_id,
				owner_id: req.owner_id,
				payload: &payload,
				idempotency_key,
				now,
			},
		)
		.await?;
		let mut state = projection.state();

		state.apply(&payload);
		projection.set_state(state);

		projection.version = event_id;
		projection.updated_at = now;

		memos::update_projection(&mut *tx, &projection).await?;

		match &payload {
			MemoEventPayload::ReminderSet { remind_at } => {
				self.schedule_reminder(&mut tx, req.owner_id, req.memo_id, *remind_at, now).await?;
			},
			MemoEventPayload::ReminderCleared => {
				jobs::cancel_pending_reminders(&mut *tx, req.owner_id, req.memo_id, now).await?;
			},
			_ => {},
		}

		tx.commit().await?;

		tracing::debug!(
			memo_id = req.memo_id,
			owner_id = req.owner_id,
			event_id,
			event_type = %payload.event_type(),
			"Memo event appended."
		);

		Ok(AppendEventResponse { memo_id: req.memo_id, event_id, version: projection.version })
	}
}
