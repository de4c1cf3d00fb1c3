use std::time::Instant;

use chrono::Utc;
use shelf_progress::{Status, StatusSink};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use super::{
	backend::Backends,
	error::Error,
	fan_out::FanOut,
	report::{JobReport, Outcome},
	request::Request,
};

/// Fans a [`Request`] out to every eligible backend and joins their outcomes.
#[derive(Debug, Clone, Default)]
pub struct JobCoordinator {
	status_sink: Option<StatusSink>,
}

impl JobCoordinator {
	#[must_use]
	pub const fn new() -> Self {
		Self { status_sink: None }
	}

	/// Each backend gets a [`Status::Finished`] notification on this sink when its operation completes.
	#[must_use]
	pub fn with_status_sink(mut self, status_sink: StatusSink) -> Self {
		self.status_sink = Some(status_sink);
		self
	}

	pub async fn run(
		&self,
		request: &Request,
		backends: &Backends,
		cancel_token: &CancellationToken,
	) -> Result<(), Error> {
		self.run_with_report(request, backends, cancel_token)
			.await
			.into_result()
	}

	/// Runs the request on every enabled backend supporting its operation, in registration
	/// order, and resolves once all of them completed.
	///
	/// The first error reported wins, later ones are only counted on the report. Cancellation
	/// only stops new backend operations from being started, the ones already running are
	/// waited for, as they are expected to observe the same token.
	#[instrument(
		skip_all,
		fields(job_id = %request.id(), operation = %request.kind(), backends = backends.len())
	)]
	pub async fn run_with_report(
		&self,
		request: &Request,
		backends: &Backends,
		cancel_token: &CancellationToken,
	) -> JobReport {
		let started_at = Utc::now();
		let start = Instant::now();
		let kind = request.kind();

		let mut fan_out = FanOut::new();
		let mut skipped = 0;
		let mut anything_ran = false;

		for backend in backends {
			if !backend.is_enabled() || !backend.supports(kind) {
				trace!(backend = backend.name(), "Skipping backend");
				skipped += 1;
				continue;
			}

			// At least one backend supports this operation
			anything_ran = true;

			if cancel_token.is_cancelled() {
				debug!(
					backend = backend.name(),
					"Cancelled while dispatching, not starting any more backend operations"
				);
				fan_out.record_error(Error::Cancelled);
				break;
			}

			fan_out.start(
				backend.name(),
				backend.handle(request, cancel_token.clone()),
			);
		}

		if !anything_ran {
			info!("No backend could handle the operation");
		}

		let joined = fan_out
			.join_with(|backend_name, _res| {
				if let Some(status_sink) = &self.status_sink {
					status_sink
						.for_source(backend_name)
						.status(None, Status::Finished);
				}
			})
			.await;

		let dropped_errors = joined.errors.dropped();
		let outcome = match (anything_ran, joined.errors.into_result()) {
			(false, _) => Outcome::NoEligibleBackend,
			(true, Ok(())) => Outcome::Completed,
			(true, Err(e)) => Outcome::Failed(e),
		};

		let report = JobReport {
			id: request.id(),
			operation: kind,
			started: joined.started,
			skipped,
			dropped_errors,
			outcome,
			started_at,
			elapsed: start.elapsed(),
		};

		debug!(%report);

		report
	}
}
