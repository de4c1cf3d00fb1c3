use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::error::ConfigError;

const DEFAULT_CANCEL_GRACE_MS: u64 = 5_000;
const DEFAULT_LOG_FILTER: &str = "info,shelf_job_system=debug,shelf_transaction_bridge=debug";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSystemConfig {
	/// How long a transaction wait keeps listening for the remote completion after a cancel
	/// request was forwarded.
	pub cancel_grace_ms: u64,
	/// [`EnvFilter`] directives used by [`init_tracing`].
	pub log_filter: String,
}

impl Default for JobSystemConfig {
	fn default() -> Self {
		Self {
			cancel_grace_ms: DEFAULT_CANCEL_GRACE_MS,
			log_filter: DEFAULT_LOG_FILTER.to_string(),
		}
	}
}

impl JobSystemConfig {
	/// Loads a JSON config file, missing fields fall back to their defaults.
	pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		let data = fs::read(path).await.map_err(|source| ConfigError::Io {
			path: path.into(),
			source,
		})?;

		serde_json::from_slice(&data).map_err(Into::into)
	}

	#[must_use]
	pub const fn cancel_grace(&self) -> Duration {
		Duration::from_millis(self.cancel_grace_ms)
	}
}

/// Installs a global console subscriber, `RUST_LOG` directives take precedence over the ones
/// from the config.
pub fn init_tracing(config: &JobSystemConfig) -> Result<(), ConfigError> {
	let mut filter = EnvFilter::try_new(&config.log_filter)?;

	if let Ok(env_directives) = std::env::var(EnvFilter::DEFAULT_ENV) {
		for directive in env_directives.split(',').filter(|d| !d.is_empty()) {
			filter = filter.add_directive(directive.parse()?);
		}
	}

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_file(true).with_line_number(true))
		.try_init()
		.map_err(|_| ConfigError::TracingAlreadyInstalled)
}
