//!
//! # Progress
//!
//! Backends report what they are doing through a [`StatusSink`], a cheap cloneable handle over
//! a multiplexed channel of [`ProgressEvent`]s. Events arrive unordered and may or may not be
//! tagged with the item they refer to.
//!
//! A [`ProgressAggregator`] consumes those events and keeps per item state:
//! - the last in-range percentage (out-of-range values are ignored, so an "unknown" percentage
//!   is never turned into a spurious `0`);
//! - whether the operation on the item may still be cancelled, which can only go from allowed
//!   to disallowed;
//! - a coarse [`Status`] classification.
//!
//! Entering an installing or removing status on a regular item also invalidates anything that
//! depends on the set of pending updates, signaled through an [`Invalidation`] notifier.
//!
//! ```
//! use shelf_progress::{ItemRef, ProgressAggregator, StatusSink, Status};
//!
//! let (sink, events_rx) = StatusSink::channel();
//! let mut aggregator = ProgressAggregator::new();
//!
//! let app = ItemRef::app("org.example.Editor");
//! sink.status(Some(app.clone()), Status::Downloading);
//! sink.percentage(Some(app), 42);
//!
//! while let Ok(event) = events_rx.try_recv() {
//!     aggregator.observe(event);
//! }
//!
//! let entry = aggregator.snapshot("org.example.Editor").unwrap();
//! assert_eq!(entry.status, Status::Downloading);
//! assert_eq!(entry.percentage, Some(42));
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod aggregator;
mod event;
mod sink;

pub use aggregator::{Invalidation, ProgressAggregator, ProgressEntry};
pub use event::{Change, ItemId, ItemRef, ProgressEvent, Status};
pub use sink::StatusSink;
