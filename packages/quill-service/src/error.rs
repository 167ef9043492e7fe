use quill_domain::QuotaExceeded;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Guest note limit reached: at most {limit} notes.")]
	QuotaExceeded { limit: usize },
	#[error("Permission denied: {message}")]
	PermissionDenied { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Persist failed: {message}")]
	PersistFailure { message: String },
	#[error("AI request failed: {message}")]
	AiRequestFailure { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
impl From<QuotaExceeded> for Error {
	fn from(err: QuotaExceeded) -> Self {
		Self::QuotaExceeded { limit: err.limit }
	}
}

impl From<quill_store::Error> for Error {
	fn from(err: quill_store::Error) -> Self {
		match err {
			quill_store::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::PersistFailure { message: other.to_string() },
		}
	}
}

impl From<quill_providers::Error> for Error {
	fn from(err: quill_providers::Error) -> Self {
		Self::AiRequestFailure { message: err.to_string() }
	}
}
