//!
//! # Job System
//!
//! Shelf's Job System coordinates a single logical operation ("download this system upgrade",
//! "refresh all sources") across every backend able to perform it, like package managers
//! or system image updaters, and joins them back into a single result.
//!
//! Just bring your backends as [`Backend`] trait objects and a [`Request`], the coordinator will:
//! - Dispatch the request to every enabled backend supporting the operation, in registration order;
//! - Run all backend operations concurrently on the calling task, without locks;
//! - Join exactly once, no matter if zero, some or all backends were started;
//! - Surface the first error reported, counting (and logging) the ones after it;
//! - Stop starting new backend operations once the cancellation token is signaled.
//!
//! The same join machinery is available as [`FanOut`] and [`SectionLoader`] for any other
//! "start N things, wait for all of them" need, like loading the sections of a page.
//!
//! ## Basic example
//!
//! ```
//! use shelf_job_system::{
//!     async_trait, Backend, DownloadUpgradeFlags, Entity, Error, JobCoordinator, OperationKind,
//!     Request,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct ImageUpdater;
//!
//! #[async_trait]
//! impl Backend for ImageUpdater {
//!     fn name(&self) -> &str {
//!         "image-updater"
//!     }
//!
//!     fn supports(&self, kind: OperationKind) -> bool {
//!         kind == OperationKind::DownloadUpgrade
//!     }
//!
//!     async fn handle(&self, _request: &Request, _token: CancellationToken) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let backends: Vec<Arc<dyn Backend>> = vec![Arc::new(ImageUpdater)];
//!     let request = Request::download_upgrade(
//!         Entity::operating_system("org.example.OS", "Example OS 42"),
//!         DownloadUpgradeFlags::default(),
//!     );
//!
//!     let res = JobCoordinator::new()
//!         .run(&request, &backends, &CancellationToken::new())
//!         .await;
//!
//!     assert!(res.is_ok());
//! }
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

mod backend;
mod config;
mod coordinator;
mod error;
mod fan_out;
mod manager;
mod pending;
mod report;
mod request;
mod section;

pub use async_trait::async_trait;

pub use backend::{Backend, Backends};
pub use config::{init_tracing, JobSystemConfig};
pub use coordinator::JobCoordinator;
pub use error::{ConfigError, Error};
pub use fan_out::{FanOut, Joined};
pub use manager::JobManager;
pub use pending::{ErrorSlot, PendingOps};
pub use report::{JobReport, Outcome};
pub use request::{
	DownloadUpgradeFlags, Entity, EntityId, EntityKind, InstallFlags, JobId, Operation,
	OperationKind, RefreshMetadataFlags, Request, Target, UninstallFlags, UpdateFlags,
	UpgradeFlags,
};
pub use section::{LoadOutcome, SectionBatch, SectionLoader};
