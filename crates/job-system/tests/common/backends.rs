use shelf_job_system::{async_trait, Backend, Error, OperationKind, Request};

use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use tokio::{sync::mpsc, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared record of what backends actually did, to check side effects survive a failed job.
#[derive(Debug, Default, Clone)]
pub struct SideEffects(Arc<Mutex<Vec<String>>>);

impl SideEffects {
	pub fn push(&self, effect: impl Into<String>) {
		self.0.lock().unwrap().push(effect.into());
	}

	pub fn all(&self) -> Vec<String> {
		self.0.lock().unwrap().clone()
	}
}

#[derive(Debug)]
pub enum Behavior {
	Succeed,
	Fail(&'static str),
	Sleep(Duration),
	/// Completes with whatever outcome the test sends.
	Signaled(tokio::sync::Mutex<mpsc::Receiver<Result<(), Error>>>),
	/// Only completes once the job is cancelled.
	UntilCancelled,
}

#[derive(Debug)]
pub struct FakeBackend {
	name: &'static str,
	enabled: bool,
	supported: Vec<OperationKind>,
	behavior: Behavior,
	started: AtomicUsize,
	side_effects: SideEffects,
}

impl FakeBackend {
	pub fn new(name: &'static str, behavior: Behavior) -> Self {
		Self {
			name,
			enabled: true,
			supported: vec![
				OperationKind::DownloadUpgrade,
				OperationKind::RefreshMetadata,
				OperationKind::UpdateApps,
			],
			behavior,
			started: AtomicUsize::new(0),
			side_effects: SideEffects::default(),
		}
	}

	pub fn succeeding(name: &'static str) -> Self {
		Self::new(name, Behavior::Succeed)
	}

	pub fn failing(name: &'static str, detail: &'static str) -> Self {
		Self::new(name, Behavior::Fail(detail))
	}

	pub fn signaled(name: &'static str) -> (Self, mpsc::Sender<Result<(), Error>>) {
		let (tx, rx) = mpsc::channel(1);

		(
			Self::new(name, Behavior::Signaled(tokio::sync::Mutex::new(rx))),
			tx,
		)
	}

	pub fn disabled(mut self) -> Self {
		self.enabled = false;
		self
	}

	pub fn supporting_nothing(mut self) -> Self {
		self.supported.clear();
		self
	}

	pub fn with_side_effects(mut self, side_effects: SideEffects) -> Self {
		self.side_effects = side_effects;
		self
	}

	pub fn started(&self) -> usize {
		self.started.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Backend for FakeBackend {
	fn name(&self) -> &str {
		self.name
	}

	fn is_enabled(&self) -> bool {
		self.enabled
	}

	fn supports(&self, kind: OperationKind) -> bool {
		self.supported.contains(&kind)
	}

	async fn handle(&self, request: &Request, cancel_token: CancellationToken) -> Result<(), Error> {
		self.started.fetch_add(1, Ordering::SeqCst);
		info!(backend = self.name, job_id = %request.id(), "Fake backend handling request");

		match &self.behavior {
			Behavior::Succeed => {
				self.side_effects.push(format!("{} done", self.name));
				Ok(())
			}
			Behavior::Fail(detail) => Err(Error::backend(*detail)),
			Behavior::Sleep(duration) => {
				sleep(*duration).await;
				self.side_effects.push(format!("{} done", self.name));
				Ok(())
			}
			Behavior::Signaled(rx) => rx
				.lock()
				.await
				.recv()
				.await
				.unwrap_or(Err(Error::backend("signal sender dropped"))),
			Behavior::UntilCancelled => {
				cancel_token.cancelled().await;
				Err(Error::Cancelled)
			}
		}
	}
}

/// Plays the user hitting "cancel" while the backends are being enumerated.
#[derive(Debug)]
pub struct CancelsWhileQueried {
	pub cancel_token: CancellationToken,
}

#[async_trait]
impl Backend for CancelsWhileQueried {
	fn name(&self) -> &str {
		"cancels-while-queried"
	}

	fn supports(&self, _kind: OperationKind) -> bool {
		self.cancel_token.cancel();
		false
	}

	async fn handle(&self, _request: &Request, _cancel_token: CancellationToken) -> Result<(), Error> {
		unreachable!("never supports anything")
	}
}
