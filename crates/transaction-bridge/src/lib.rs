//!
//! # Transaction Bridge
//!
//! Some backends don't do their work themselves, they ask a remote service to run a
//! transaction and get notified when it is over. This crate turns such a transaction into a
//! single awaitable call, usable from a [`Backend`](shelf_job_system::Backend) implementation:
//!
//! - The signal subscription is always taken before the remote is told to start;
//! - Cancellation is forwarded to the remote as a best effort, the wait goes on until the remote
//!   reports completion or the cancel grace period runs out;
//! - Progress reported by the remote can be forwarded to a [`StatusSink`](shelf_progress::StatusSink);
//! - The subscription is torn down on every exit path.
//!

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

mod bridge;
mod endpoint;
mod session;
mod signal;

pub use bridge::{BridgeConfig, TransactionBridge};
pub use endpoint::{Connector, Endpoint};
pub use session::SessionState;
pub use signal::{Notification, Signal, SignalArg};
