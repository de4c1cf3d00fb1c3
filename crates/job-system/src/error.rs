use std::{io, path::Path};

use thiserror::Error;

/// The single error surfaced to callers of a job.
///
/// A job may see several of these from different backends, only the first one is kept,
/// see [`ErrorSlot`](crate::ErrorSlot).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("operation was cancelled")]
	Cancelled,
	#[error("backend failed: {0}")]
	BackendFailed(String),
	#[error("transaction endpoint unreachable <address='{address}'>: {reason}")]
	TransactionEndpointUnreachable { address: String, reason: String },
	#[error("transaction protocol violation: {0}")]
	ProtocolViolation(String),
}

impl Error {
	pub fn backend(detail: impl Into<String>) -> Self {
		Self::BackendFailed(detail.into())
	}

	#[must_use]
	pub const fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file <path='{}'>: {source}", .path.display())]
	Io {
		path: Box<Path>,
		#[source]
		source: io::Error,
	},
	#[error("failed to parse config file: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("invalid log filter directive: {0}")]
	LogFilter(#[from] tracing_subscriber::filter::ParseError),
	#[error("a global tracing subscriber was already installed")]
	TracingAlreadyInstalled,
}
