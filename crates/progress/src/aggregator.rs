use std::collections::HashMap;

use async_channel as chan;
use serde::Serialize;
use tracing::{debug, trace};

use super::event::{Change, ItemId, ItemRef, ProgressEvent, Status};

const ITEMS_INITIAL_CAPACITY: usize = 16;

/// Progress state of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
	/// `None` while the percentage is unknown.
	pub percentage: Option<u8>,
	pub allow_cancel: bool,
	pub status: Status,
}

impl Default for ProgressEntry {
	fn default() -> Self {
		Self {
			percentage: None,
			allow_cancel: true,
			status: Status::Unknown,
		}
	}
}

impl ProgressEntry {
	fn apply_allow_cancel(&mut self, allow_cancel: bool) {
		// Only go from allowed to disallowed, an operation that committed to something
		// uncancellable can't become cancellable again later on
		if self.allow_cancel {
			self.allow_cancel = allow_cancel;
		}
	}
}

/// Notification that anything derived from the set of pending updates must be recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
	pub item: Option<ItemId>,
	pub status: Status,
}

/// Folds an unordered stream of [`ProgressEvent`]s into per item and aggregate state.
///
/// Entries are created on first observation and are only discarded together with the
/// aggregator itself.
#[derive(Debug)]
pub struct ProgressAggregator {
	entries: HashMap<ItemId, ProgressEntry>,
	backend_status: HashMap<String, Status>,
	aggregate_percentage: Option<u8>,
	track_aggregate: bool,
	invalidations: usize,
	invalidation_tx: Option<chan::Sender<Invalidation>>,
}

impl Default for ProgressAggregator {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressAggregator {
	#[must_use]
	pub fn new() -> Self {
		Self {
			entries: HashMap::with_capacity(ITEMS_INITIAL_CAPACITY),
			backend_status: HashMap::new(),
			aggregate_percentage: None,
			track_aggregate: false,
			invalidations: 0,
			invalidation_tx: None,
		}
	}

	/// Item percentages also override the aggregate percentage, used when a whole list of
	/// items is being acted upon by a single operation.
	#[must_use]
	pub const fn with_aggregate_progress(mut self) -> Self {
		self.track_aggregate = true;
		self
	}

	#[must_use]
	pub fn with_invalidation_notifier(mut self, invalidation_tx: chan::Sender<Invalidation>) -> Self {
		self.invalidation_tx = Some(invalidation_tx);
		self
	}

	pub fn observe(&mut self, event: ProgressEvent) {
		let ProgressEvent {
			source,
			item,
			change,
			allow_cancel,
		} = event;

		match change {
			Change::Status(status) => self.observe_status(source.as_deref(), item.as_ref(), status),
			Change::Percentage(percentage) => self.observe_percentage(item.as_ref(), percentage),
		}

		// Only items that were actually updated get an entry
		if let Some(allow_cancel) = allow_cancel {
			if let Some(entry) = self.entry_mut(item.as_ref()) {
				entry.apply_allow_cancel(allow_cancel);
			}
		}
	}

	/// Drains a multiplexed event stream until every sender is gone.
	pub async fn consume(&mut self, events_rx: chan::Receiver<ProgressEvent>) {
		while let Ok(event) = events_rx.recv().await {
			self.observe(event);
		}

		trace!(items = self.entries.len(), "Progress event stream closed");
	}

	#[must_use]
	pub fn snapshot(&self, item_id: &str) -> Option<ProgressEntry> {
		self.entries.get(item_id).copied()
	}

	#[must_use]
	pub const fn aggregate_percentage(&self) -> Option<u8> {
		self.aggregate_percentage
	}

	#[must_use]
	pub fn backend_status(&self, backend: &str) -> Status {
		self.backend_status
			.get(backend)
			.copied()
			.unwrap_or_default()
	}

	/// How many times dependent state was invalidated so far.
	#[must_use]
	pub const fn invalidations(&self) -> usize {
		self.invalidations
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn entry_mut(&mut self, item: Option<&ItemRef>) -> Option<&mut ProgressEntry> {
		let id = item?.id.as_ref()?;

		Some(self.entries.entry(id.clone()).or_default())
	}

	fn observe_status(&mut self, source: Option<&str>, item: Option<&ItemRef>, status: Status) {
		if status == Status::Unknown {
			trace!(?item, "Ignoring unknown status");
			return;
		}

		if let Some(entry) = self.entry_mut(item) {
			entry.status = status;
		} else if let Some(source) = source {
			self.backend_status.insert(source.to_owned(), status);
		}

		// The operating system umbrella is built from many packages, a status change on it
		// says nothing about individual pending updates
		if status.alters_installed_set() && item.map_or(true, ItemRef::is_regular) {
			self.invalidate(item, status);
		}
	}

	fn observe_percentage(&mut self, item: Option<&ItemRef>, percentage: i32) {
		let Ok(percentage) = u8::try_from(percentage) else {
			trace!(%percentage, "Ignoring out of range percentage");
			return;
		};

		if percentage > 100 {
			trace!(%percentage, "Ignoring out of range percentage");
			return;
		}

		let track_aggregate = self.track_aggregate;

		match self.entry_mut(item) {
			Some(entry) => {
				entry.percentage = Some(percentage);
				if track_aggregate {
					self.aggregate_percentage = Some(percentage);
				}
			}
			None => self.aggregate_percentage = Some(percentage),
		}
	}

	fn invalidate(&mut self, item: Option<&ItemRef>, status: Status) {
		self.invalidations += 1;

		let invalidation = Invalidation {
			item: item.and_then(|item| item.id.clone()),
			status,
		};

		debug!(?invalidation, "Pending updates invalidated");

		if let Some(invalidation_tx) = &self.invalidation_tx {
			if invalidation_tx.try_send(invalidation).is_err() {
				trace!("Invalidation notifier is gone or full");
			}
		}
	}
}
