use shelf_job_system::Error;

use std::{fmt, sync::Arc};

use async_channel as chan;
use tokio::spawn;
use tracing::{debug, error, trace, warn};

use super::{endpoint::Endpoint, signal::Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Created,
	AwaitingStart,
	Running,
	Finished,
	Cancelled,
	Errored,
}

impl SessionState {
	#[must_use]
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Finished | Self::Cancelled | Self::Errored)
	}

	const fn can_move_to(self, next: Self) -> bool {
		match (self, next) {
			(Self::Created, Self::AwaitingStart) | (Self::AwaitingStart, Self::Running) => true,
			(from, to) => !from.is_terminal() && to.is_terminal(),
		}
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Created => "created",
			Self::AwaitingStart => "awaiting start",
			Self::Running => "running",
			Self::Finished => "finished",
			Self::Cancelled => "cancelled",
			Self::Errored => "errored",
		};

		f.write_str(s)
	}
}

/// One outstanding remote transaction, owned by the wait that opened it.
///
/// The signal subscription is taken when the session is opened and torn down when it is
/// dropped, whatever state it ended up in.
pub(crate) struct TransactionSession {
	address: String,
	endpoint: Arc<dyn Endpoint>,
	signals_rx: chan::Receiver<Signal>,
	state: SessionState,
	started: bool,
	/// Why the session ended in [`SessionState::Errored`], remote or local.
	error: Option<Error>,
	cancel_requested: bool,
}

impl TransactionSession {
	pub(crate) fn open(address: impl Into<String>, endpoint: Arc<dyn Endpoint>) -> Self {
		let signals_rx = endpoint.subscribe();

		Self {
			address: address.into(),
			endpoint,
			signals_rx,
			state: SessionState::Created,
			started: false,
			error: None,
			cancel_requested: false,
		}
	}

	pub(crate) const fn state(&self) -> SessionState {
		self.state
	}

	/// The remote confirmed the transaction is running, it stays so once the session ended.
	pub(crate) const fn is_started(&self) -> bool {
		self.started
	}

	pub(crate) fn endpoint(&self) -> Arc<dyn Endpoint> {
		Arc::clone(&self.endpoint)
	}

	pub(crate) fn signals(&self) -> chan::Receiver<Signal> {
		self.signals_rx.clone()
	}

	pub(crate) const fn error(&self) -> Option<&Error> {
		self.error.as_ref()
	}

	/// Moves to `next`, returns `false` without changing anything if that isn't a legal move.
	pub(crate) fn transition(&mut self, next: SessionState) -> bool {
		if !self.state.can_move_to(next) {
			fault(&self.address, self.state, next);
			return false;
		}

		trace!(address = %self.address, from = %self.state, to = %next, "Session transition");
		self.state = next;
		self.started |= next == SessionState::Running;

		true
	}

	/// Fires a cancel request at the remote without waiting for it, only the first call does
	/// anything.
	pub(crate) fn forward_cancel(&mut self) {
		if self.cancel_requested {
			return;
		}
		self.cancel_requested = true;

		debug!(address = %self.address, "Forwarding cancellation to remote transaction");

		let endpoint = self.endpoint();
		let address = self.address.clone();
		spawn(async move {
			if let Err(e) = endpoint.cancel().await {
				warn!(%address, ?e, "Remote transaction refused to cancel");
			}
		});
	}

	pub(crate) const fn cancel_requested(&self) -> bool {
		self.cancel_requested
	}

	/// Moves to the terminal state matching `res` and hands it back.
	pub(crate) fn resolve(&mut self, res: Result<(), Error>) -> Result<(), Error> {
		let next = match &res {
			Ok(()) => SessionState::Finished,
			Err(Error::Cancelled) => SessionState::Cancelled,
			Err(e) => {
				self.error = Some(e.clone());
				SessionState::Errored
			}
		};

		self.transition(next);

		res
	}
}

impl Drop for TransactionSession {
	fn drop(&mut self) {
		self.signals_rx.close();

		if !self.state.is_terminal() {
			warn!(
				address = %self.address,
				state = %self.state,
				"Transaction session dropped before reaching a final state"
			);
		}
	}
}

#[track_caller]
fn fault(address: &str, from: SessionState, to: SessionState) {
	error!(
		%address,
		%from,
		%to,
		"Illegal transaction session transition; ignoring"
	);

	if cfg!(debug_assertions) {
		panic!("illegal transaction session transition from {from} to {to}");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use async_trait::async_trait;

	struct Silent(chan::Sender<Signal>, chan::Receiver<Signal>);

	impl Silent {
		fn new() -> Arc<Self> {
			let (tx, rx) = chan::unbounded();
			Arc::new(Self(tx, rx))
		}
	}

	#[async_trait]
	impl Endpoint for Silent {
		fn subscribe(&self) -> chan::Receiver<Signal> {
			self.1.clone()
		}

		async fn start(&self) -> Result<bool, Error> {
			Ok(true)
		}

		async fn cancel(&self) -> Result<(), Error> {
			Ok(())
		}
	}

	#[test]
	fn happy_path_transitions() {
		let mut session = TransactionSession::open("/tx/1", Silent::new());
		assert_eq!(session.state(), SessionState::Created);
		assert!(!session.is_started());

		assert!(session.transition(SessionState::AwaitingStart));
		assert!(!session.is_started());
		assert!(session.transition(SessionState::Running));
		assert!(session.is_started());

		assert_eq!(session.resolve(Ok(())), Ok(()));
		assert_eq!(session.state(), SessionState::Finished);
	}

	#[test]
	fn any_live_state_may_end() {
		for live in [SessionState::Created, SessionState::AwaitingStart, SessionState::Running] {
			for terminal in [
				SessionState::Finished,
				SessionState::Cancelled,
				SessionState::Errored,
			] {
				assert!(live.can_move_to(terminal), "{live} -> {terminal}");
			}
		}

		assert!(!SessionState::Created.can_move_to(SessionState::Running));
		assert!(!SessionState::Running.can_move_to(SessionState::AwaitingStart));
	}

	#[test]
	fn errors_are_kept_on_the_session() {
		let mut session = TransactionSession::open("/tx/2", Silent::new());

		assert_eq!(
			session.resolve(Err(Error::backend("rollback"))),
			Err(Error::backend("rollback"))
		);
		assert_eq!(session.state(), SessionState::Errored);
		assert_eq!(session.error(), Some(&Error::backend("rollback")));
	}

	#[test]
	fn local_failures_are_kept_too() {
		let mut session = TransactionSession::open("/tx/5", Silent::new());
		assert!(session.transition(SessionState::AwaitingStart));

		let violation =
			Error::ProtocolViolation("signal stream closed before `Finished`".to_string());
		assert_eq!(session.resolve(Err(violation.clone())), Err(violation.clone()));

		assert_eq!(session.state(), SessionState::Errored);
		assert_eq!(session.error(), Some(&violation));
	}

	#[test]
	fn cancellation_is_not_an_error() {
		let mut session = TransactionSession::open("/tx/6", Silent::new());

		assert_eq!(session.resolve(Err(Error::Cancelled)), Err(Error::Cancelled));
		assert_eq!(session.state(), SessionState::Cancelled);
		assert!(session.error().is_none());
	}

	#[test]
	fn dropping_the_session_tears_down_the_subscription() {
		let endpoint = Silent::new();

		let session = TransactionSession::open("/tx/3", Arc::clone(&endpoint) as Arc<dyn Endpoint>);
		drop(session);

		assert!(endpoint.0.is_closed());
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "illegal transaction session transition from finished to cancelled")]
	fn terminal_states_are_final() {
		let mut session = TransactionSession::open("/tx/4", Silent::new());
		let _ = session.resolve(Ok(()));

		session.transition(SessionState::Cancelled);
	}

	#[test]
	#[cfg(not(debug_assertions))]
	fn terminal_states_are_final() {
		let mut session = TransactionSession::open("/tx/4", Silent::new());
		let _ = session.resolve(Ok(()));

		assert!(!session.transition(SessionState::Cancelled));
		assert_eq!(session.state(), SessionState::Finished);
	}
}
