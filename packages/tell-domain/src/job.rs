use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

pub const REMINDER_DISPATCH: &str = "REMINDER_DISPATCH";

// 2^62 seconds is far past any cap; larger exponents saturate to the cap.
const MAX_BACKOFF_EXPONENT: i32 = 62;

#[derive(Debug, thiserror::Error)]
pub enum JobPayloadError {
	#[error("Unknown job type {0:?}.")]
	UnknownType(String),
	#[error("Malformed {job_type} payload: {message}")]
	Malformed { job_type: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
	Pending,
	Running,
	Done,
	Failed,
	Cancelled,
}
impl JobStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Running => "RUNNING",
			Self::Done => "DONE",
			Self::Failed => "FAILED",
			Self::Cancelled => "CANCELLED",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"PENDING" => Some(Self::Pending),
			"RUNNING" => Some(Self::Running),
			"DONE" => Some(Self::Done),
			"FAILED" => Some(Self::Failed),
			"CANCELLED" => Some(Self::Cancelled),
			_ => None,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Done | Self::Failed | Self::Cancelled)
	}
}
impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDispatch {
	pub memo_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPayload {
	ReminderDispatch(ReminderDispatch),
}
impl JobPayload {
	pub fn reminder(memo_id: i64) -> Self {
		Self::ReminderDispatch(ReminderDispatch { memo_id })
	}

	pub fn job_type(&self) -> &'static str {
		match self {
			Self::ReminderDispatch(_) => REMINDER_DISPATCH,
		}
	}

	pub fn to_json(&self) -> Result<Value, JobPayloadError> {
		match self {
			Self::ReminderDispatch(body) => serde_json::to_value(body).map_err(|err| {
				JobPayloadError::Malformed { job_type: REMINDER_DISPATCH, message: err.to_string() }
			}),
		}
	}

	pub fn decode(job_type: &str, payload: &Value) -> Result<Self, JobPayloadError> {
		match job_type {
			REMINDER_DISPATCH => serde_json::from_value(payload.clone())
				.map(Self::ReminderDispatch)
				.map_err(|err| JobPayloadError::Malformed {
					job_type: REMINDER_DISPATCH,
					message: err.to_string(),
				}),
			other => Err(JobPayloadError::UnknownType(other.to_string())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
	Retry { attempts: i32, due_at: OffsetDateTime },
	Fail { attempts: i32 },
}

/// Exponential backoff in whole seconds, `min(2^attempts, cap)`.
pub fn backoff_for_attempt(attempts: i32, cap: Duration) -> Duration {
	let exp = attempts.clamp(0, MAX_BACKOFF_EXPONENT) as u32;
	let seconds = 1_i64 << exp;

	Duration::seconds(seconds).min(cap)
}

/// Decides what happens to a job whose execution just failed after `attempts` prior failures.
pub fn retry_decision(
	attempts: i32,
	max_attempts: i32,
	now: OffsetDateTime,
	cap: Duration,
) -> RetryDecision {
	let next_attempts = attempts.saturating_add(1);

	if next_attempts >= max_attempts {
		return RetryDecision::Fail { attempts: next_attempts };
	}

	RetryDecision::Retry {
		attempts: next_attempts,
		due_at: now + backoff_for_attempt(next_attempts, cap),
	}
}
