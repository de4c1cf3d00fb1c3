use shelf_job_system::{Error, JobSystemConfig};
use shelf_progress::{ItemRef, ProgressEvent, StatusSink};

use std::{future::ready, pin::pin, sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use futures_concurrency::{future::Race, stream::Merge};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

use super::{
	endpoint::{Connector, Endpoint},
	session::{SessionState, TransactionSession},
	signal::{Notification, Signal},
};

const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
	/// How long to keep waiting for the remote completion after a cancel was forwarded.
	pub cancel_grace: Duration,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			cancel_grace: DEFAULT_CANCEL_GRACE,
		}
	}
}

impl From<&JobSystemConfig> for BridgeConfig {
	fn from(config: &JobSystemConfig) -> Self {
		Self {
			cancel_grace: config.cancel_grace(),
		}
	}
}

/// Presents a remote multi step transaction as a single awaitable operation.
#[derive(Debug)]
pub struct TransactionBridge<C> {
	connector: C,
	config: BridgeConfig,
	progress: Option<(StatusSink, ItemRef)>,
}

impl<C: Connector> TransactionBridge<C> {
	pub const fn new(connector: C, config: BridgeConfig) -> Self {
		Self {
			connector,
			config,
			progress: None,
		}
	}

	/// Forwards the remote progress notifications as percentage events about `item`.
	#[must_use]
	pub fn with_progress(mut self, status_sink: StatusSink, item: ItemRef) -> Self {
		self.progress = Some((status_sink, item));
		self
	}

	/// Waits for the transaction at `address` to finish.
	///
	/// Signaling `cancel_token` forwards a cancel request to the remote and keeps waiting for
	/// its completion for at most [`BridgeConfig::cancel_grace`]. A failure reported by the
	/// remote takes precedence over the cancellation.
	#[instrument(skip(self, cancel_token), err)]
	pub async fn await_transaction(
		&self,
		address: &str,
		cancel_token: &CancellationToken,
	) -> Result<(), Error> {
		let Some(endpoint) = self.connect(address, cancel_token).await? else {
			debug!("Cancelled while connecting to the transaction endpoint");
			return Err(Error::Cancelled);
		};

		// Subscribes before anything else, so no signal can be missed
		let mut session = TransactionSession::open(address, endpoint);

		let res = self.drive(&mut session, cancel_token).await;

		debug!(
			state = %session.state(),
			started = session.is_started(),
			cancel_requested = session.cancel_requested(),
			error = ?session.error(),
			"Transaction session done"
		);

		res
	}

	async fn connect(
		&self,
		address: &str,
		cancel_token: &CancellationToken,
	) -> Result<Option<Arc<dyn Endpoint>>, Error> {
		(
			async {
				self.connector
					.connect(address)
					.await
					.map(Some)
					.map_err(|e| match e {
						e @ Error::TransactionEndpointUnreachable { .. } => e,
						e => Error::TransactionEndpointUnreachable {
							address: address.to_string(),
							reason: e.to_string(),
						},
					})
			},
			async {
				cancel_token.cancelled().await;
				Ok(None)
			},
		)
			.race()
			.await
	}

	async fn drive(
		&self,
		session: &mut TransactionSession,
		cancel_token: &CancellationToken,
	) -> Result<(), Error> {
		if cancel_token.is_cancelled() {
			session.forward_cancel();
			return session.resolve(Err(Error::Cancelled));
		}

		session.transition(SessionState::AwaitingStart);

		let endpoint = session.endpoint();
		let started = (async { Some(endpoint.start().await) }, async {
			cancel_token.cancelled().await;
			None
		})
			.race()
			.await;

		match started {
			None => {
				debug!("Cancelled while starting the transaction");
				session.forward_cancel();
				return session.resolve(Err(Error::Cancelled));
			}
			Some(Err(e)) => return session.resolve(Err(e)),
			Some(Ok(false)) => {
				return session.resolve(Err(Error::backend(
					"remote refused to start the transaction",
				)));
			}
			Some(Ok(true)) => {
				session.transition(SessionState::Running);
			}
		}

		let res = self.wait_finished(session, cancel_token).await;

		session.resolve(res)
	}

	async fn wait_finished(
		&self,
		session: &mut TransactionSession,
		cancel_token: &CancellationToken,
	) -> Result<(), Error> {
		enum StreamMessage {
			Signal(Signal),
			SignalsClosed,
			Cancelled,
			GraceExpired,
		}

		let cancel_grace = self.config.cancel_grace;

		let mut msg_stream = pin!((
			session
				.signals()
				.map(StreamMessage::Signal)
				.chain(stream::once(ready(StreamMessage::SignalsClosed))),
			stream::once(cancel_token.cancelled())
				.map(|()| StreamMessage::Cancelled)
				.chain(stream::once(async move {
					sleep(cancel_grace).await;
					StreamMessage::GraceExpired
				})),
		)
			.merge());

		while let Some(msg) = msg_stream.next().await {
			match msg {
				StreamMessage::Signal(signal) => match signal.decode()? {
					Notification::Finished { success: false, message } => {
						return Err(Error::BackendFailed(message));
					}

					Notification::Finished { success: true, .. } => {
						return if cancel_token.is_cancelled() {
							Err(Error::Cancelled)
						} else {
							Ok(())
						};
					}

					Notification::PercentProgress { text, percentage } => {
						trace!(%text, percentage, "Transaction progress");
						self.forward_progress(percentage);
					}

					Notification::Other(member) => {
						trace!(%member, "Ignoring transaction signal");
					}
				},

				StreamMessage::SignalsClosed => {
					return if cancel_token.is_cancelled() {
						Err(Error::Cancelled)
					} else {
						Err(Error::ProtocolViolation(
							"signal stream closed before `Finished`".to_string(),
						))
					};
				}

				StreamMessage::Cancelled => session.forward_cancel(),

				StreamMessage::GraceExpired => {
					warn!(
						?cancel_grace,
						"Remote transaction didn't finish after being cancelled, giving up on it"
					);
					return Err(Error::Cancelled);
				}
			}
		}

		error!("Transaction message stream ended without a final notification");

		Err(Error::ProtocolViolation(
			"transaction ended without a final notification".to_string(),
		))
	}

	fn forward_progress(&self, percentage: u32) {
		if let Some((status_sink, item)) = &self.progress {
			// Out of range is the aggregator's "unknown"
			let percentage = i32::try_from(percentage).unwrap_or(-1);

			status_sink.emit(ProgressEvent::percentage(Some(item.clone()), percentage));
		}
	}
}
