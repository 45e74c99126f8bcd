use std::fmt;

use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why one provider was left out of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
	pub provider: String,
	pub reason: String,
}
impl fmt::Display for ProviderFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.provider, self.reason)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Every targeted provider failed: {}", join_failures(.failures))]
	AggregateDispatch { failures: Vec<ProviderFailure> },
	#[error("Feedback error: {message}")]
	Feedback { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
}
impl Error {
	pub(crate) fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}
}
impl From<lodestar_storage::Error> for Error {
	fn from(err: lodestar_storage::Error) -> Self {
		match err {
			lodestar_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			lodestar_storage::Error::InvalidArgument(message) => Self::Validation { message },
			lodestar_storage::Error::NotFound(message) => Self::NotFound { message },
			lodestar_storage::Error::InvalidRecord(message) => Self::Storage { message },
		}
	}
}
impl From<lodestar_providers::Error> for Error {
	fn from(err: lodestar_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

fn join_failures(failures: &[ProviderFailure]) -> String {
	failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
