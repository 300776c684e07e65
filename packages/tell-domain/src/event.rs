use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Debug, thiserror::Error)]
pub enum EventError {
	#[error("Unknown event type {0:?}.")]
	UnknownType(String),
	#[error("CREATED events are only written when a memo is created.")]
	CreatedNotAppendable,
	#[error("{0} events require non-empty content.")]
	MissingContent(EventType),
	#[error("{0} events require remind_at.")]
	MissingRemindAt(EventType),
	#[error("Malformed {event_type} payload: {message}")]
	MalformedPayload { event_type: EventType, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
	Created,
	Updated,
	Archived,
	Restored,
	ReminderSet,
	ReminderCleared,
}
impl EventType {
	pub const ALL: [Self; 6] = [
		Self::Created,
		Self::Updated,
		Self::Archived,
		Self::Restored,
		Self::ReminderSet,
		Self::ReminderCleared,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Created => "CREATED",
			Self::Updated => "UPDATED",
			Self::Archived => "ARCHIVED",
			Self::Restored => "RESTORED",
			Self::ReminderSet => "REMINDER_SET",
			Self::ReminderCleared => "REMINDER_CLEARED",
		}
	}

	/// Case-insensitive; surrounding whitespace is ignored.
	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|event_type| event_type.as_str().eq_ignore_ascii_case(raw))
	}
}
impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The fixed payload schema of every memo event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoEventPayload {
	Created { content: String },
	Updated { content: String },
	Archived,
	Restored,
	ReminderSet { remind_at: OffsetDateTime },
	ReminderCleared,
}
impl MemoEventPayload {
	/// Validates a caller-submitted event against the required fields of its type.
	///
	/// Fields that the type does not use are ignored.
	pub fn for_append(
		event_type: &str,
		content: Option<&str>,
		remind_at: Option<OffsetDateTime>,
	) -> Result<Self, EventError> {
		let parsed = EventType::parse(event_type)
			.ok_or_else(|| EventError::UnknownType(event_type.trim().to_string()))?;

		match parsed {
			EventType::Created => Err(EventError::CreatedNotAppendable),
			EventType::Updated => {
				let content = content
					.map(str::trim)
					.filter(|content| !content.is_empty())
					.ok_or(EventError::MissingContent(parsed))?;

				Ok(Self::Updated { content: content.to_string() })
			},
			EventType::Archived => Ok(Self::Archived),
			EventType::Restored => Ok(Self::Restored),
			EventType::ReminderSet => {
				let remind_at = remind_at.ok_or(EventError::MissingRemindAt(parsed))?;

				Ok(Self::ReminderSet { remind_at })
			},
			EventType::ReminderCleared => Ok(Self::ReminderCleared),
		}
	}

	pub fn event_type(&self) -> EventType {
		match self {
			Self::Created { .. } => EventType::Created,
			Self::Updated { .. } => EventType::Updated,
			Self::Archived => EventType::Archived,
			Self::Restored => EventType::Restored,
			Self::ReminderSet { .. } => EventType::ReminderSet,
			Self::ReminderCleared => EventType::ReminderCleared,
		}
	}

	/// Encodes the type-specific body stored in the event log. The type itself lives in its own
	/// column.
	pub fn to_json(&self) -> Result<Value, EventError> {
		let encoded = match self {
			Self::Created { content } | Self::Updated { content } =>
				serde_json::to_value(ContentBody { content: content.clone() }),
			Self::ReminderSet { remind_at } => {
				let remind_at = remind_at.format(&Rfc3339).map_err(|err| {
					EventError::MalformedPayload {
						event_type: EventType::ReminderSet,
						message: err.to_string(),
					}
				})?;

				serde_json::to_value(ReminderBody { remind_at })
			},
			Self::Archived | Self::Restored | Self::ReminderCleared =>
				Ok(Value::Object(Default::default())),
		};

		encoded.map_err(|err| EventError::MalformedPayload {
			event_type: self.event_type(),
			message: err.to_string(),
		})
	}

	/// Decodes a stored event row back into its typed payload.
	pub fn from_json(event_type: &str, payload: &Value) -> Result<Self, EventError> {
		let parsed = EventType::parse(event_type)
			.ok_or_else(|| EventError::UnknownType(event_type.to_string()))?;
		let malformed = |err: serde_json::Error| EventError::MalformedPayload {
			event_type: parsed,
			message: err.to_string(),
		};

		match parsed {
			EventType::Created => {
				let body: ContentBody =
					serde_json::from_value(payload.clone()).map_err(malformed)?;

				Ok(Self::Created { content: body.content })
			},
			EventType::Updated => {
				let body: ContentBody =
					serde_json::from_value(payload.clone()).map_err(malformed)?;

				Ok(Self::Updated { content: body.content })
			},
			EventType::Archived => Ok(Self::Archived),
			EventType::Restored => Ok(Self::Restored),
			EventType::ReminderSet => {
				let body: ReminderBody =
					serde_json::from_value(payload.clone()).map_err(malformed)?;
				let remind_at = OffsetDateTime::parse(&body.remind_at, &Rfc3339).map_err(|err| {
					EventError::MalformedPayload { event_type: parsed, message: err.to_string() }
				})?;

				Ok(Self::ReminderSet { remind_at })
			},
			EventType::ReminderCleared => Ok(Self::ReminderCleared),
		}
	}
}

#[derive(Serialize, Deserialize)]
struct ContentBody {
	content: String,
}

#[derive(Serialize, Deserialize)]
struct ReminderBody {
	remind_at: String,
}
