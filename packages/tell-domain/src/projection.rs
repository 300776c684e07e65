use time::OffsetDateTime;

use crate::{event::MemoEventPayload, tags};

/// Materialized memo state, derived only by folding events in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoState {
	pub content: String,
	pub archived: bool,
	pub remind_at: Option<OffsetDateTime>,
	pub tags: Vec<String>,
}
impl MemoState {
	pub fn apply(&mut self, payload: &MemoEventPayload) {
		match payload {
			MemoEventPayload::Created { content } => {
				self.content = content.clone();
				self.tags = tags::extract_tags(content);
				self.archived = false;
			},
			MemoEventPayload::Updated { content } => {
				self.content = content.clone();
				self.tags = tags::extract_tags(content);
			},
			MemoEventPayload::Archived => self.archived = true,
			MemoEventPayload::Restored => self.archived = false,
			MemoEventPayload::ReminderSet { remind_at } => self.remind_at = Some(*remind_at),
			MemoEventPayload::ReminderCleared => self.remind_at = None,
		}
	}

	pub fn replay<'a, I>(events: I) -> Self
	where
		I: IntoIterator<Item = &'a MemoEventPayload>,
	{
		let mut state = Self::default();

		for event in events {
			state.apply(event);
		}

		state
	}
}
