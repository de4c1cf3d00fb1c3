use std::sync::Arc;

use async_channel as chan;
use tracing::trace;

use super::event::{ItemRef, ProgressEvent, Status};

/// Side channel through which backends publish status and progress notifications.
///
/// Emitting never blocks and never fails from the backend point of view: if nobody is
/// listening anymore the event is simply discarded.
#[derive(Debug, Clone)]
pub struct StatusSink {
	source: Option<Arc<str>>,
	events_tx: chan::Sender<ProgressEvent>,
}

impl StatusSink {
	#[must_use]
	pub const fn new(events_tx: chan::Sender<ProgressEvent>) -> Self {
		Self {
			source: None,
			events_tx,
		}
	}

	/// Creates a sink together with the receiving end of its (unbounded) event stream.
	#[must_use]
	pub fn channel() -> (Self, chan::Receiver<ProgressEvent>) {
		let (events_tx, events_rx) = chan::unbounded();

		(Self::new(events_tx), events_rx)
	}

	/// A sink sharing the same stream whose events are tagged with the given backend name.
	#[must_use]
	pub fn for_source(&self, source: impl Into<Arc<str>>) -> Self {
		Self {
			source: Some(source.into()),
			events_tx: self.events_tx.clone(),
		}
	}

	pub fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	pub fn emit(&self, mut event: ProgressEvent) {
		if event.source.is_none() {
			event.source.clone_from(&self.source);
		}

		if let Err(chan::TrySendError::Closed(event) | chan::TrySendError::Full(event)) =
			self.events_tx.try_send(event)
		{
			trace!(?event, "Progress event dropped, nobody is listening");
		}
	}

	pub fn status(&self, item: Option<ItemRef>, status: Status) {
		self.emit(ProgressEvent::status(item, status));
	}

	pub fn percentage(&self, item: Option<ItemRef>, percentage: i32) {
		self.emit(ProgressEvent::percentage(item, percentage));
	}
}
