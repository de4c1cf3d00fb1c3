use shelf_job_system::Error;
use shelf_transaction_bridge::{Connector, Endpoint, Signal};

use std::{
	collections::{HashMap, HashSet},
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

use async_channel as chan;
use async_trait::async_trait;
use tracing::info;

/// A scripted remote transaction.
#[derive(Debug)]
pub struct FakeRemote {
	signals_tx: chan::Sender<Signal>,
	signals_rx: chan::Receiver<Signal>,
	accepts_start: bool,
	on_start: Vec<Signal>,
	on_cancel: Vec<Signal>,
	starts: AtomicUsize,
	cancels: AtomicUsize,
	cancel_tx: chan::Sender<()>,
	cancel_rx: chan::Receiver<()>,
}

impl Default for FakeRemote {
	fn default() -> Self {
		let (signals_tx, signals_rx) = chan::unbounded();
		let (cancel_tx, cancel_rx) = chan::unbounded();

		Self {
			signals_tx,
			signals_rx,
			accepts_start: true,
			on_start: Vec::new(),
			on_cancel: Vec::new(),
			starts: AtomicUsize::new(0),
			cancels: AtomicUsize::new(0),
			cancel_tx,
			cancel_rx,
		}
	}
}

impl FakeRemote {
	/// Never says anything after starting.
	pub fn silent() -> Self {
		Self::default()
	}

	/// Emits `signals` while handling the start call, before acknowledging it.
	pub fn emitting_on_start(signals: impl IntoIterator<Item = Signal>) -> Self {
		Self {
			on_start: signals.into_iter().collect(),
			..Self::default()
		}
	}

	pub fn finishing(success: bool, message: &str) -> Self {
		Self::emitting_on_start([Signal::finished(success, message)])
	}

	pub fn refusing_to_start() -> Self {
		Self {
			accepts_start: false,
			..Self::default()
		}
	}

	/// Emits `signals` when asked to cancel.
	pub fn emitting_on_cancel(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
		self.on_cancel = signals.into_iter().collect();
		self
	}

	pub fn emit(&self, signal: Signal) {
		self.signals_tx.try_send(signal).ok();
	}

	/// Simulates the remote going away.
	pub fn vanish(&self) {
		self.signals_tx.close();
	}

	pub fn starts(&self) -> usize {
		self.starts.load(Ordering::SeqCst)
	}

	pub fn cancels(&self) -> usize {
		self.cancels.load(Ordering::SeqCst)
	}

	/// Resolves once a cancel request reached the remote.
	pub async fn cancel_received(&self) {
		self.cancel_rx.recv().await.unwrap();
	}

	pub fn subscription_closed(&self) -> bool {
		self.signals_tx.is_closed()
	}
}

#[async_trait]
impl Endpoint for FakeRemote {
	fn subscribe(&self) -> chan::Receiver<Signal> {
		self.signals_rx.clone()
	}

	async fn start(&self) -> Result<bool, Error> {
		self.starts.fetch_add(1, Ordering::SeqCst);

		if !self.accepts_start {
			return Ok(false);
		}

		for signal in &self.on_start {
			self.emit(signal.clone());
		}

		Ok(true)
	}

	async fn cancel(&self) -> Result<(), Error> {
		self.cancels.fetch_add(1, Ordering::SeqCst);
		info!("Fake remote asked to cancel");

		for signal in &self.on_cancel {
			self.emit(signal.clone());
		}

		self.cancel_tx.try_send(()).ok();

		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct FakeConnector {
	remotes: HashMap<String, Arc<FakeRemote>>,
	hanging: HashSet<String>,
}

impl FakeConnector {
	pub fn with_remote(mut self, address: &str, remote: FakeRemote) -> (Self, Arc<FakeRemote>) {
		let remote = Arc::new(remote);
		self.remotes.insert(address.to_string(), Arc::clone(&remote));

		(self, remote)
	}

	/// Connecting to `address` never completes.
	pub fn hanging_on(mut self, address: &str) -> Self {
		self.hanging.insert(address.to_string());
		self
	}
}

#[async_trait]
impl Connector for FakeConnector {
	async fn connect(&self, address: &str) -> Result<Arc<dyn Endpoint>, Error> {
		if self.hanging.contains(address) {
			futures::future::pending::<()>().await;
		}

		self.remotes
			.get(address)
			.map(|remote| Arc::clone(remote) as Arc<dyn Endpoint>)
			.ok_or_else(|| Error::backend("no such object path"))
	}
}
