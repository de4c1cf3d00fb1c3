use std::future::Future;

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use tracing::{error, trace};

use super::{
	error::Error,
	pending::{ErrorSlot, PendingOps},
};

type Completion = (String, Result<(), Error>);

/// What a [`FanOut`] hands back once every started operation completed.
#[derive(Debug)]
pub struct Joined {
	pub errors: ErrorSlot,
	pub started: usize,
}

impl Joined {
	pub fn into_result(self) -> Result<(), Error> {
		self.errors.into_result()
	}
}

/// Starts a number of operations only known while dispatching and joins them back into a
/// single outcome.
///
/// All operations are polled by whoever awaits [`join`](Self::join), on the same task, so no
/// completion can race with the bookkeeping and nothing here needs a lock. Completion order is
/// whatever order the operations finish in.
///
/// ```
/// # use shelf_job_system::{Error, FanOut};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut fan_out = FanOut::new();
///
/// fan_out.start("featured", async { Ok(()) });
/// fan_out.start("recent", async { Err(Error::backend("offline")) });
///
/// let joined = fan_out.join().await;
/// assert_eq!(joined.started, 2);
/// assert_eq!(joined.into_result(), Err(Error::backend("offline")));
/// # }
/// ```
pub struct FanOut<'a> {
	pending: PendingOps,
	in_flight: FuturesUnordered<BoxFuture<'a, Completion>>,
	started: usize,
}

impl Default for FanOut<'_> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> FanOut<'a> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			pending: PendingOps::armed(),
			in_flight: FuturesUnordered::new(),
			started: 0,
		}
	}

	pub fn start(
		&mut self,
		label: impl Into<String>,
		operation: impl Future<Output = Result<(), Error>> + Send + 'a,
	) {
		let label = label.into();

		trace!(%label, "Starting operation");

		self.pending.add_operation();
		self.started += 1;
		self.in_flight
			.push(async move { (label, operation.await) }.boxed());
	}

	/// Records an error that isn't the outcome of a started operation.
	pub fn record_error(&mut self, error: Error) {
		self.pending.record_error(error);
	}

	#[must_use]
	pub const fn started(&self) -> usize {
		self.started
	}

	pub async fn join(self) -> Joined {
		self.join_with(|_, _| {}).await
	}

	/// Ends dispatch and waits for every started operation, calling `on_completion` with the
	/// label and outcome of each one as it completes.
	pub async fn join_with(
		mut self,
		mut on_completion: impl FnMut(&str, &Result<(), Error>) + Send,
	) -> Joined {
		let started = self.started;

		if let Some(errors) = self.pending.finish_dispatch() {
			return Joined { errors, started };
		}

		while let Some((label, res)) = self.in_flight.next().await {
			trace!(%label, success = res.is_ok(), "Operation completed");

			on_completion(&label, &res);

			if let Some(errors) = self.pending.complete_one(res.err()) {
				return Joined { errors, started };
			}
		}

		error!(
			pending = self.pending.pending(),
			"Every operation completed but the pending counter didn't reach zero"
		);

		Joined {
			errors: self.pending.take_errors(),
			started,
		}
	}
}
