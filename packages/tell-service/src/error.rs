use tell_domain::event::EventError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid event: {message}")]
	InvalidEvent { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Store failures are the only class a caller may retry as-is.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Storage { .. })
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		tell_storage::Error::from(err).into()
	}
}

impl From<tell_storage::Error> for Error {
	fn from(err: tell_storage::Error) -> Self {
		match err {
			tell_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			tell_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			tell_storage::Error::NotFound(message) => Self::NotFound { message },
			tell_storage::Error::Conflict(message) => Self::Conflict { message },
			tell_storage::Error::Payload(message) => Self::Storage { message },
		}
	}
}

impl From<EventError> for Error {
	fn from(err: EventError) -> Self {
		Self::InvalidEvent { message: err.to_string() }
	}
}
