use shelf_job_system::Error;

use std::{fmt, sync::Arc};

use async_channel as chan;
use async_trait::async_trait;

use super::signal::Signal;

/// Opens sessions against remote transaction endpoints, identified by an address.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
	/// Connects to the endpoint at `address`, any error is reported to callers as
	/// [`Error::TransactionEndpointUnreachable`].
	async fn connect(&self, address: &str) -> Result<Arc<dyn Endpoint>, Error>;
}

/// One remote transaction.
///
/// The remote only starts emitting signals after [`start`](Endpoint::start) is called, so the
/// subscription must be taken first.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
	/// Subscribes to every signal emitted by the remote from now on.
	fn subscribe(&self) -> chan::Receiver<Signal>;

	/// Tells the remote we are listening, returns whether it accepted to start.
	async fn start(&self) -> Result<bool, Error>;

	/// Asks the remote to cancel the transaction, it may or may not honor it.
	async fn cancel(&self) -> Result<(), Error>;
}

impl fmt::Debug for dyn Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Endpoint").finish_non_exhaustive()
	}
}

#[async_trait]
impl<C: Connector> Connector for Arc<C> {
	async fn connect(&self, address: &str) -> Result<Arc<dyn Endpoint>, Error> {
		C::connect(self.as_ref(), address).await
	}
}
