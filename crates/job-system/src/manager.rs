use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace, warn};

use super::{
	backend::Backends,
	coordinator::JobCoordinator,
	error::Error,
	report::JobReport,
	request::{EntityId, JobId, OperationKind, Request},
};

const JOBS_INITIAL_CAPACITY: usize = 8;

#[derive(Debug)]
struct TrackedJob {
	id: JobId,
	kind: OperationKind,
	entities: Vec<EntityId>,
}

impl TrackedJob {
	fn targets(&self, entity_id: &str) -> bool {
		self.entities.iter().any(|id| id == entity_id)
	}
}

/// Keeps track of the jobs currently in flight, so callers can ask whether an entity has
/// pending work before starting more.
#[derive(Debug)]
pub struct JobManager {
	coordinator: JobCoordinator,
	jobs: Mutex<Vec<TrackedJob>>,
}

impl Default for JobManager {
	fn default() -> Self {
		Self::new(JobCoordinator::new())
	}
}

impl JobManager {
	#[must_use]
	pub fn new(coordinator: JobCoordinator) -> Self {
		Self {
			coordinator,
			jobs: Mutex::new(Vec::with_capacity(JOBS_INITIAL_CAPACITY)),
		}
	}

	/// Starts tracking `request`, returns `false` if it was already being tracked.
	pub fn add_job(&self, request: &Request) -> bool {
		let mut jobs = self.lock_jobs();

		if jobs.iter().any(|job| job.id == request.id()) {
			return false;
		}

		jobs.push(TrackedJob {
			id: request.id(),
			kind: request.kind(),
			entities: request
				.target()
				.entities()
				.iter()
				.map(|entity| entity.id.clone())
				.collect(),
		});

		true
	}

	/// Stops tracking a job, returns `false` if it wasn't being tracked.
	pub fn remove_job(&self, job_id: JobId) -> bool {
		let mut jobs = self.lock_jobs();

		let Some(idx) = jobs.iter().position(|job| job.id == job_id) else {
			return false;
		};

		jobs.swap_remove(idx);

		true
	}

	#[must_use]
	pub fn pending_jobs_for(&self, entity_id: &str) -> Vec<JobId> {
		self.lock_jobs()
			.iter()
			.filter(|job| job.targets(entity_id))
			.map(|job| job.id)
			.collect()
	}

	#[must_use]
	pub fn has_pending_job_kind(&self, entity_id: &str, kind: OperationKind) -> bool {
		self.lock_jobs()
			.iter()
			.any(|job| job.kind == kind && job.targets(entity_id))
	}

	#[must_use]
	pub fn job_count(&self) -> usize {
		self.lock_jobs().len()
	}

	/// Runs `request` through the coordinator while tracking it, it stops being tracked as
	/// soon as it joins, fails or the returned future is dropped.
	#[instrument(skip_all, fields(job_id = %request.id()))]
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

	pub async fn run_with_report(
		&self,
		request: &Request,
		backends: &Backends,
		cancel_token: &CancellationToken,
	) -> JobReport {
		let _registration = if self.add_job(request) {
			Some(Registration {
				manager: self,
				job_id: request.id(),
			})
		} else {
			warn!("Job is already being tracked, running it again untracked");
			None
		};

		self.coordinator
			.run_with_report(request, backends, cancel_token)
			.await
	}

	fn lock_jobs(&self) -> MutexGuard<'_, Vec<TrackedJob>> {
		// Never held across an await point, a poisoned lock still has consistent data
		self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Drop for JobManager {
	fn drop(&mut self) {
		let jobs = self
			.jobs
			.get_mut()
			.unwrap_or_else(PoisonError::into_inner);

		if !jobs.is_empty() {
			warn!(
				job_ids = ?jobs.iter().map(|job| job.id).collect::<Vec<_>>(),
				"Job manager dropped with jobs still in flight"
			);
		}
	}
}

struct Registration<'manager> {
	manager: &'manager JobManager,
	job_id: JobId,
}

impl Drop for Registration<'_> {
	fn drop(&mut self) {
		if self.manager.remove_job(self.job_id) {
			trace!(job_id = %self.job_id, "Job no longer tracked");
		}
	}
}
