/// How a failed job is routed: retried through the backoff policy or failed at once.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
	#[error("{0}")]
	Retryable(String),
	#[error("{0}")]
	Fatal(String),
}
impl From<tell_storage::Error> for HandlerError {
	fn from(err: tell_storage::Error) -> Self {
		Self::Retryable(err.to_string())
	}
}
