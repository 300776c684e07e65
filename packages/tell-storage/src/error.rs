use tell_domain::{event::EventError, job::JobPayloadError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Invalid payload: {0}")]
	Payload(String),
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		// Unique constraints back idempotency keys, so a violation means "already applied".
		if let sqlx::Error::Database(db_err) = &err
			&& db_err.is_unique_violation()
		{
			return Self::Conflict(db_err.message().to_string());
		}

		Self::Sqlx(err)
	}
}

impl From<EventError> for Error {
	fn from(err: EventError) -> Self {
		Self::Payload(err.to_string())
	}
}

impl From<JobPayloadError> for Error {
	fn from(err: JobPayloadError) -> Self {
		Self::Payload(err.to_string())
	}
}
