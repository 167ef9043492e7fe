#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Invalid document at {path}: {message}")]
	InvalidDocument { path: String, message: String },
	#[error("Subscription {label} closed before producing a value.")]
	Closed { label: String },
}
