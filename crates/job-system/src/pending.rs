use std::mem;

use tracing::{debug, error, trace};

use super::error::Error;

/// Keeps the first error reported by the operations of a job.
///
/// Every later error is only counted and logged, it never replaces the first one.
#[derive(Debug, Default)]
pub struct ErrorSlot {
	first: Option<Error>,
	dropped: usize,
}

impl ErrorSlot {
	pub fn record(&mut self, error: Error) {
		if self.first.is_none() {
			trace!(%error, "Keeping first error");
			self.first = Some(error);
		} else {
			self.dropped += 1;
			debug!(%error, dropped = self.dropped, "Additional error, keeping the first one");
		}
	}

	#[must_use]
	pub const fn first(&self) -> Option<&Error> {
		self.first.as_ref()
	}

	/// How many errors were reported after the first one.
	#[must_use]
	pub const fn dropped(&self) -> usize {
		self.dropped
	}

	#[must_use]
	pub const fn is_empty(&self) -> bool {
		self.first.is_none()
	}

	pub fn into_result(self) -> Result<(), Error> {
		self.first.map_or(Ok(()), Err)
	}
}

/// Counts the operations that still have to complete before a job can deliver its result.
///
/// Dispatch holds one extra sentinel unit from [`arm`](Self::arm) until
/// [`finish_dispatch`](Self::finish_dispatch), so the count can't reach zero while operations
/// are still being started. Whichever release takes the count to zero hands out the
/// [`ErrorSlot`], which happens exactly once.
///
/// Releasing an already zeroed counter is a double completion bug: it panics on debug builds
/// and is logged and ignored on release builds.
#[derive(Debug, Default)]
pub struct PendingOps {
	count: usize,
	armed: bool,
	errors: ErrorSlot,
}

impl PendingOps {
	/// A counter already holding its dispatch sentinel.
	#[must_use]
	pub fn armed() -> Self {
		let mut pending = Self::default();
		pending.arm();
		pending
	}

	pub fn arm(&mut self) {
		if self.armed || self.count != 0 {
			fault("arm", self.count);
			return;
		}

		self.count = 1;
		self.armed = true;
	}

	/// Accounts for one more operation actually started.
	pub fn add_operation(&mut self) {
		if !self.armed {
			fault("add_operation", self.count);
			return;
		}

		self.count += 1;
	}

	/// Records an error that doesn't belong to any started operation, like a cancellation
	/// noticed while dispatching.
	pub fn record_error(&mut self, error: Error) {
		self.errors.record(error);
	}

	/// An operation completed, returns the collected errors if this was the last pending unit.
	#[must_use = "the job result is only handed out once"]
	pub fn complete_one(&mut self, error: Option<Error>) -> Option<ErrorSlot> {
		if self.count == 0 {
			if let Some(error) = error {
				error!(%error, "Error reported by an operation completed after the join");
			}
			fault("complete_one", self.count);
			return None;
		}

		if let Some(error) = error {
			self.errors.record(error);
		}

		self.release()
	}

	/// Drops the dispatch sentinel, no more operations will be added after this.
	#[must_use = "the job result is only handed out once"]
	pub fn finish_dispatch(&mut self) -> Option<ErrorSlot> {
		if !self.armed || self.count == 0 {
			fault("finish_dispatch", self.count);
			return None;
		}

		self.armed = false;

		self.release()
	}

	/// Operations still pending, including the dispatch sentinel if still held.
	#[must_use]
	pub const fn pending(&self) -> usize {
		self.count
	}

	#[must_use]
	pub const fn is_dispatching(&self) -> bool {
		self.armed
	}

	pub(crate) fn take_errors(&mut self) -> ErrorSlot {
		mem::take(&mut self.errors)
	}

	fn release(&mut self) -> Option<ErrorSlot> {
		self.count -= 1;

		(self.count == 0).then(|| self.take_errors())
	}
}

#[track_caller]
fn fault(operation: &'static str, count: usize) {
	error!(
		operation,
		count, "Pending operations counter misuse, probably a double completion; ignoring"
	);

	if cfg!(debug_assertions) {
		panic!("pending operations counter misuse on `{operation}` with count {count}");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_operations_join_on_finish_dispatch() {
		let mut pending = PendingOps::armed();

		let errors = pending.finish_dispatch().expect("sentinel was the only unit");

		assert!(errors.is_empty());
		assert_eq!(pending.pending(), 0);
	}

	#[test]
	fn join_fires_on_last_completion() {
		let mut pending = PendingOps::armed();
		pending.add_operation();
		pending.add_operation();

		assert!(pending.complete_one(None).is_none());
		assert!(pending.finish_dispatch().is_none());

		let errors = pending
			.complete_one(Some(Error::backend("disk full")))
			.expect("last unit");

		assert_eq!(errors.into_result(), Err(Error::backend("disk full")));
	}

	#[test]
	fn completions_before_dispatch_ends_never_join() {
		let mut pending = PendingOps::armed();
		pending.add_operation();

		// A backend completing inside its own start call
		assert!(pending.complete_one(None).is_none());
		assert!(pending.is_dispatching());

		pending.add_operation();
		assert!(pending.complete_one(None).is_none());

		assert!(pending.finish_dispatch().is_some());
	}

	#[test]
	fn first_error_wins() {
		let mut pending = PendingOps::armed();
		pending.add_operation();
		pending.add_operation();
		assert!(pending.finish_dispatch().is_none());

		assert!(pending.complete_one(Some(Error::backend("E1"))).is_none());
		let errors = pending
			.complete_one(Some(Error::backend("E2")))
			.expect("last unit");

		assert_eq!(errors.first(), Some(&Error::backend("E1")));
		assert_eq!(errors.dropped(), 1);
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "pending operations counter misuse on `complete_one`")]
	fn double_completion_panics_on_debug() {
		let mut pending = PendingOps::armed();
		assert!(pending.finish_dispatch().is_some());

		let _ = pending.complete_one(None);
	}

	#[test]
	#[cfg(not(debug_assertions))]
	fn double_completion_is_ignored_on_release() {
		let mut pending = PendingOps::armed();
		assert!(pending.finish_dispatch().is_some());

		assert!(pending.complete_one(Some(Error::Cancelled)).is_none());
		assert_eq!(pending.pending(), 0);
	}

	#[test]
	#[cfg(debug_assertions)]
	#[should_panic(expected = "pending operations counter misuse on `finish_dispatch`")]
	fn second_finish_dispatch_panics_on_debug() {
		let mut pending = PendingOps::armed();
		pending.add_operation();

		assert!(pending.finish_dispatch().is_none());
		let _ = pending.finish_dispatch();
	}
}
