use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};

use super::{
	error::Error,
	request::{JobId, OperationKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	Completed,
	/// No enabled backend supports the operation, a no-op and not a failure.
	NoEligibleBackend,
	Failed(Error),
}

/// Summary of one job run, handed out when the job joins.
#[derive(Debug, Clone)]
pub struct JobReport {
	pub id: JobId,
	pub operation: OperationKind,
	/// Backend operations actually started.
	pub started: usize,
	/// Backends skipped for being disabled or not supporting the operation.
	pub skipped: usize,
	/// Errors reported after the first one, only kept as a count.
	pub dropped_errors: usize,
	pub outcome: Outcome,
	pub started_at: DateTime<Utc>,
	pub elapsed: Duration,
}

impl JobReport {
	#[must_use]
	pub const fn is_success(&self) -> bool {
		!matches!(self.outcome, Outcome::Failed(_))
	}

	pub fn into_result(self) -> Result<(), Error> {
		match self.outcome {
			Outcome::Completed | Outcome::NoEligibleBackend => Ok(()),
			Outcome::Failed(e) => Err(e),
		}
	}
}

impl fmt::Display for JobReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Job <id='{}', operation='{}'> started {} backend operations ({} skipped) in {:?}: ",
			self.id, self.operation, self.started, self.skipped, self.elapsed
		)?;

		match &self.outcome {
			Outcome::Completed => write!(f, "completed"),
			Outcome::NoEligibleBackend => write!(f, "no backend could handle the operation"),
			Outcome::Failed(e) if self.dropped_errors > 0 => {
				write!(f, "failed: {e} ({} more errors dropped)", self.dropped_errors)
			}
			Outcome::Failed(e) => write!(f, "failed: {e}"),
		}
	}
}
