use serde::{Deserialize, Serialize};

use tell_domain::projection::MemoState;
use tell_storage::memos;

use crate::{Error, Result, TellService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildProjectionResponse {
	pub memo_id: i64,
	pub version: i64,
	pub events_applied: usize,
}

impl TellService {
	/// Recomputes a projection from the memo's full event log. Jobs are left untouched.
	pub async fn rebuild_projection(
		&self,
		owner_id: i64,
		memo_id: i64,
	) -> Result<RebuildProjectionResponse> {
		let mut tx = self.db.pool.begin().await?;
		let mut projection = memos::lock_projection(&mut *tx, memo_id, owner_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Memo not found.".to_string() })?;
		let events = memos::list_events(&mut *tx, memo_id, owner_id).await?;
		let Some(last) = events.last() else {
			return Err(Error::Storage { message: format!("Memo {memo_id} has no events.") });
		};
		let payloads =
			events.iter().map(|event| event.decode_payload()).collect::<Result<Vec<_>, _>>()?;
		let previous_version = projection.version;

		projection.set_state(MemoState::replay(&payloads));

		projection.version = last.event_id;
		projection.updated_at = last.created_at;

		memos::update_projection(&mut *tx, &projection).await?;

		tx.commit().await?;

		if previous_version != projection.version {
			tracing::warn!(
				memo_id,
				owner_id,
				previous_version,
				version = projection.version,
				"Projection version drifted from the event log."
			);
		}

		tracing::debug!(memo_id, owner_id, events = events.len(), "Projection rebuilt.");

		Ok(RebuildProjectionResponse {
			memo_id,
			version: projection.version,
			events_applied: events.len(),
		})
	}
}
