use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{
	error::Error,
	request::{OperationKind, Request},
};

/// A pluggable handler of one or more operation kinds against some underlying system, like a
/// package manager or a system image updater.
///
/// We're currently using the [`async_trait`](https://docs.rs/async-trait) crate to allow dyn async traits,
/// as backends are only known at runtime and dispatched through a list of trait objects.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
	/// Human readable name, used on logs and as the source of status notifications.
	fn name(&self) -> &str;

	/// Disabled backends are skipped without being asked about anything else.
	fn is_enabled(&self) -> bool {
		true
	}

	fn supports(&self, kind: OperationKind) -> bool;

	/// Runs the operation described by `request`.
	///
	/// The `cancel_token` is cooperative, a backend that can't stop midway is free to ignore it
	/// and complete normally.
	async fn handle(&self, request: &Request, cancel_token: CancellationToken) -> Result<(), Error>;
}

impl fmt::Debug for dyn Backend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<Backend name='{}'>", self.name())
	}
}

/// Backends known to the system at dispatch time, in registration order.
pub type Backends = [Arc<dyn Backend>];
