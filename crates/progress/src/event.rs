use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Stable identifier of an item whose progress is being tracked, usually an app unique id.
pub type ItemId = String;

/// Coarse classification of what is currently happening to an item or a backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
	#[default]
	Unknown,
	Waiting,
	Querying,
	Downloading,
	Installing,
	Removing,
	Finished,
}

impl Status {
	/// Installing or removing something may change which updates are still pending.
	#[must_use]
	pub const fn alters_installed_set(self) -> bool {
		matches!(self, Self::Installing | Self::Removing)
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Unknown => "unknown",
			Self::Waiting => "waiting",
			Self::Querying => "querying",
			Self::Downloading => "downloading",
			Self::Installing => "installing",
			Self::Removing => "removing",
			Self::Finished => "finished",
		};

		f.write_str(s)
	}
}

/// Reference to the item an event is about.
///
/// An item may lack a stable identifier (a package the backend could not map back to an app),
/// in which case it has no per item entry, but it still takes part in invalidation decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
	pub id: Option<ItemId>,
	/// The operating system itself, an umbrella over many packages.
	pub is_operating_system: bool,
}

impl ItemRef {
	pub fn app(id: impl Into<ItemId>) -> Self {
		Self {
			id: Some(id.into()),
			is_operating_system: false,
		}
	}

	pub fn operating_system(id: impl Into<ItemId>) -> Self {
		Self {
			id: Some(id.into()),
			is_operating_system: true,
		}
	}

	#[must_use]
	pub const fn unidentified() -> Self {
		Self {
			id: None,
			is_operating_system: false,
		}
	}

	/// Non umbrella items with a stable identifier.
	#[must_use]
	pub const fn is_regular(&self) -> bool {
		!self.is_operating_system && self.id.is_some()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Change {
	Status(Status),
	/// Raw percentage as reported by the backend, anything outside `0..=100` means unknown.
	Percentage(i32),
}

/// One progress notification, as emitted by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
	/// Name of the backend that emitted this event, if known.
	pub source: Option<Arc<str>>,
	pub item: Option<ItemRef>,
	pub change: Change,
	/// Whether the backend still allows the operation on `item` to be cancelled.
	pub allow_cancel: Option<bool>,
}

impl ProgressEvent {
	#[must_use]
	pub const fn status(item: Option<ItemRef>, status: Status) -> Self {
		Self {
			source: None,
			item,
			change: Change::Status(status),
			allow_cancel: None,
		}
	}

	#[must_use]
	pub const fn percentage(item: Option<ItemRef>, percentage: i32) -> Self {
		Self {
			source: None,
			item,
			change: Change::Percentage(percentage),
			allow_cancel: None,
		}
	}

	#[must_use]
	pub const fn with_allow_cancel(mut self, allow_cancel: bool) -> Self {
		self.allow_cancel = Some(allow_cancel);
		self
	}

	#[must_use]
	pub fn with_source(mut self, source: Arc<str>) -> Self {
		self.source = Some(source);
		self
	}

	pub fn item_id(&self) -> Option<&str> {
		self.item.as_ref().and_then(|item| item.id.as_deref())
	}
}
