use scout_utils::{error::FileIOError, normalize_path};

use std::{
	collections::HashMap,
	fs::Metadata,
	io,
	path::Path,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use async_channel as chan;
use futures_concurrency::future::Join;
use tokio::{
	fs, select, spawn,
	sync::RwLock,
	task::JoinHandle,
	time::sleep,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, trace, warn};

use super::{
	config::Config,
	diff::{calculate, pending_digests},
	entry::FileEntry,
	event::Event,
	filter::{Callbacks, FilterDecision, WalkErrorDecision},
	hasher::{confirm_digests, Blake3Hasher, ContentHasher},
	pool::{BoundedExecutor, WorkerPool},
	snapshot::Snapshot,
	walker::walk,
	Error,
};

/// Collects the optional collaborators of a [`Watcher`] before it is built
#[derive(Debug)]
pub struct WatcherBuilder {
	config: Config,
	callbacks: Callbacks,
	hasher: Arc<dyn ContentHasher>,
	executor: Option<Arc<dyn BoundedExecutor>>,
}

impl WatcherBuilder {
	#[must_use]
	pub fn new(config: Config) -> Self {
		Self {
			config,
			callbacks: Callbacks::default(),
			hasher: Arc::new(Blake3Hasher),
			executor: None,
		}
	}

	#[must_use]
	pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
		self.callbacks = callbacks;
		self
	}

	#[must_use]
	pub fn with_filter(
		mut self,
		filter: impl Fn(&str, &Metadata) -> FilterDecision + Send + Sync + 'static,
	) -> Self {
		self.callbacks = self.callbacks.with_filter(filter);
		self
	}

	#[must_use]
	pub fn with_walk_error_handler(
		mut self,
		on_walk_error: impl Fn(&str, Option<&Metadata>, &io::Error) -> WalkErrorDecision
			+ Send
			+ Sync
			+ 'static,
	) -> Self {
		self.callbacks = self.callbacks.with_walk_error_handler(on_walk_error);
		self
	}

	#[must_use]
	pub fn with_hasher(mut self, hasher: impl ContentHasher) -> Self {
		self.hasher = Arc::new(hasher);
		self
	}

	/// Replaces the default [`WorkerPool`], `worker_count` from the config is ignored then
	#[must_use]
	pub fn with_executor(mut self, executor: impl BoundedExecutor) -> Self {
		self.executor = Some(Arc::new(executor));
		self
	}

	pub fn build(self) -> Result<Watcher, Error> {
		let Self {
			config,
			callbacks,
			hasher,
			executor,
		} = self;

		let roots = config
			.validate()?
			.into_iter()
			.map(|path| RootState {
				snapshot: Arc::new(RwLock::new(Snapshot::new(path.clone()))),
				path,
			})
			.collect();

		let executor =
			executor.unwrap_or_else(|| Arc::new(WorkerPool::new(config.worker_count)));

		let stop_token = CancellationToken::new();

		Ok(Watcher {
			roots,
			shared: Arc::new(Shared {
				callbacks,
				hasher,
				executor,
				scan_interval: config.scan_interval,
				hashing: config.enable_content_hash,
				fail_fast: config.fail_fast,
			}),
			event_queue_capacity: config.event_queue_capacity,
			started: AtomicBool::new(false),
			running: Arc::new(AtomicBool::new(false)),
			_stop_on_drop: stop_token.clone().drop_guard(),
			stop_token,
		})
	}
}

/// Everything the per-root cycles need, frozen at build time
#[derive(Debug)]
struct Shared {
	callbacks: Callbacks,
	hasher: Arc<dyn ContentHasher>,
	executor: Arc<dyn BoundedExecutor>,
	scan_interval: Duration,
	hashing: bool,
	fail_fast: bool,
}

#[derive(Debug)]
struct RootState {
	path: String,
	snapshot: Arc<RwLock<Snapshot>>,
}

/// Polling change detector over a fixed set of roots.
///
/// Each root gets its own scan cycle on its own timer, all of them feed a single bounded event
/// stream that is closed once every cycle has finished. Dropping the watcher stops every cycle.
#[derive(Debug)]
pub struct Watcher {
	roots: Vec<RootState>,
	shared: Arc<Shared>,
	event_queue_capacity: usize,
	started: AtomicBool,
	running: Arc<AtomicBool>,
	stop_token: CancellationToken,
	_stop_on_drop: DropGuard,
}

impl Watcher {
	/// Watcher with the default filter, error policy, hasher and worker pool
	pub fn new(config: Config) -> Result<Self, Error> {
		WatcherBuilder::new(config).build()
	}

	#[must_use]
	pub fn builder(config: Config) -> WatcherBuilder {
		WatcherBuilder::new(config)
	}

	/// Scans every root, then launches the background cycles and hands back the event stream.
	///
	/// The first scan of all roots runs concurrently. If any of them fails, the others are
	/// abandoned and nothing is launched. The stream starts with one [`Event::Init`] per entry
	/// found, in path order within each root. Init events of different roots interleave.
	pub async fn start(&self) -> Result<chan::Receiver<Event>, Error> {
		if self.started.swap(true, Ordering::AcqRel) {
			return Err(Error::AlreadyStarted);
		}

		let loaded = match self.initial_load().await {
			Ok(loaded) => loaded,
			Err(e) => {
				self.started.store(false, Ordering::Release);
				return Err(e);
			}
		};

		let (events_tx, events_rx) = chan::bounded(self.event_queue_capacity);

		let handles = self
			.roots
			.iter()
			.zip(loaded)
			.map(|(state, init_errors)| {
				let cycle = RootCycle {
					root: state.path.clone(),
					snapshot: Arc::clone(&state.snapshot),
					shared: Arc::clone(&self.shared),
					stop_token: self.stop_token.clone(),
					events_tx: events_tx.clone(),
				};

				(state.path.clone(), spawn(cycle.run(init_errors)))
			})
			.collect::<Vec<_>>();

		self.running.store(true, Ordering::Release);
		spawn(supervise(handles, events_tx, Arc::clone(&self.running)));

		debug!(roots = self.roots.len(), "Watcher started");

		Ok(events_rx)
	}

	/// Asks every cycle to finish, each one notices before its next scan. Doesn't wait.
	pub fn stop(&self) {
		debug!("Stop requested");
		self.stop_token.cancel();
	}

	/// `true` between a successful [`start`](Self::start) and the moment stop is requested or
	/// every cycle ended by itself.
	#[must_use]
	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire) && !self.stop_token.is_cancelled()
	}

	/// Normalized roots, in configuration order without duplicates
	pub fn roots(&self) -> impl Iterator<Item = &str> {
		self.roots.iter().map(|state| state.path.as_str())
	}

	/// Copy of the current snapshot of `root`, if it is one of the watched roots
	pub async fn snapshot(&self, root: impl AsRef<Path>) -> Option<Snapshot> {
		let root = normalize_path(root).ok()?;
		let state = self.roots.iter().find(|state| state.path == root)?;

		let snapshot = state.snapshot.read().await.clone();
		Some(snapshot)
	}

	/// Walks every root concurrently and fills their snapshots, returning the digest failures of
	/// each root in root order.
	async fn initial_load(&self) -> Result<Vec<Vec<Error>>, Error> {
		for state in &self.roots {
			if let Err(e) = fs::metadata(&state.path).await {
				return Err(Error::RootNotFound(FileIOError::from((&state.path, e))));
			}
		}

		let cancel = self.stop_token.child_token();
		let callbacks = &self.shared.callbacks;

		let results = self
			.roots
			.iter()
			.map(|state| {
				let cancel = &cancel;
				async move {
					let res = walk(&state.path, callbacks, Some(cancel)).await;
					if res.is_err() {
						cancel.cancel();
					}
					res
				}
			})
			.collect::<Vec<_>>()
			.join()
			.await;

		let mut listings = Vec::with_capacity(results.len());
		let mut failure: Option<(&str, Error)> = None;

		for (state, res) in self.roots.iter().zip(results) {
			match res {
				Ok(entries) => listings.push(entries),
				Err(e) => {
					warn!(root = %state.path, "Initial scan failed: {e:#}");
					if failure
						.as_ref()
						.map_or(true, |(_, first)| first.is_canceled() && !e.is_canceled())
					{
						failure = Some((state.path.as_str(), e));
					}
				}
			}
		}

		if let Some((root, source)) = failure {
			return Err(Error::InitialScan {
				root: root.to_string(),
				source: Box::new(source),
			});
		}

		let shared = &self.shared;

		let init_errors = self
			.roots
			.iter()
			.zip(listings)
			.map(|(state, entries)| async move {
				let mut fresh = into_listing(entries);

				let errors = if shared.hashing {
					let pending = pending_digests(&Snapshot::new(state.path.as_str()), &mut fresh);
					confirm_digests(&shared.hasher, &*shared.executor, &mut fresh, pending).await
				} else {
					Vec::new()
				};

				trace!(root = %state.path, entries = fresh.len(), "Initial snapshot ready");

				state.snapshot.write().await.replace_all(fresh);

				errors
			})
			.collect::<Vec<_>>()
			.join()
			.await;

		Ok(init_errors)
	}
}

fn into_listing(entries: Vec<FileEntry>) -> HashMap<String, FileEntry> {
	entries
		.into_iter()
		.map(|entry| (entry.path.clone(), entry))
		.collect()
}

/// Scan, diff and emit loop of a single root
struct RootCycle {
	root: String,
	snapshot: Arc<RwLock<Snapshot>>,
	shared: Arc<Shared>,
	stop_token: CancellationToken,
	events_tx: chan::Sender<Event>,
}

impl RootCycle {
	async fn run(self, init_errors: Vec<Error>) {
		let root = self.root.as_str();

		let initial = self
			.snapshot
			.read()
			.await
			.sorted()
			.into_iter()
			.cloned()
			.collect::<Vec<_>>();

		debug!(%root, entries = initial.len(), "Emitting initial snapshot");

		for entry in initial {
			if !self.emit(Event::Init(entry)).await {
				return;
			}
		}

		for error in init_errors {
			if !self.emit_error(error).await {
				return;
			}
		}

		loop {
			select! {
				() = sleep(self.shared.scan_interval) => {}
				() = self.stop_token.cancelled() => {}
			}

			if self.stop_token.is_cancelled() {
				debug!(%root, "Stop requested, root cycle finished");
				break;
			}

			match self.cycle().await {
				Ok(true) => {}
				Ok(false) => {
					debug!(%root, "Event receiver dropped, root cycle finished");
					break;
				}
				Err(e) => {
					error!(%root, "Root cycle failed: {e:#}");
					if self.shared.fail_fast {
						self.stop_token.cancel();
					}
					self.emit_error(e).await;
					break;
				}
			}
		}
	}

	/// One scan of the root; `Ok(false)` means nobody is listening anymore
	async fn cycle(&self) -> Result<bool, Error> {
		let root = self.root.as_str();
		trace!(%root, "Scan cycle started");

		let mut fresh = into_listing(walk(root, &self.shared.callbacks, None).await?);

		let hash_errors = if self.shared.hashing {
			let pending = pending_digests(&*self.snapshot.read().await, &mut fresh);
			confirm_digests(
				&self.shared.hasher,
				&*self.shared.executor,
				&mut fresh,
				pending,
			)
			.await
		} else {
			Vec::new()
		};

		let changes = calculate(&mut *self.snapshot.write().await, fresh, self.shared.hashing);

		if !changes.is_empty() {
			debug!(
				%root,
				created = changes.created.len(),
				changed = changes.changed.len(),
				removed = changes.removed.len(),
				"Changes detected"
			);
		}

		for error in hash_errors {
			if !self.emit_error(error).await {
				return Ok(false);
			}
		}

		for event in changes.into_events() {
			if !self.emit(event).await {
				return Ok(false);
			}
		}

		Ok(true)
	}

	async fn emit(&self, event: Event) -> bool {
		self.events_tx.send(event).await.is_ok()
	}

	async fn emit_error(&self, error: Error) -> bool {
		self.emit(Event::Error {
			root: self.root.clone(),
			error,
		})
		.await
	}
}

/// Waits for every root cycle, then closes the event stream
async fn supervise(
	handles: Vec<(String, JoinHandle<()>)>,
	events_tx: chan::Sender<Event>,
	running: Arc<AtomicBool>,
) {
	let results = handles
		.into_iter()
		.map(|(root, handle)| async move { (root, handle.await) })
		.collect::<Vec<_>>()
		.join()
		.await;

	for (root, res) in results {
		if let Err(e) = res {
			error!(%root, "Root cycle task failed: {e:#?}");
			if events_tx
				.send(Event::Error {
					root: root.clone(),
					error: Error::CycleJoin(root),
				})
				.await
				.is_err()
			{
				break;
			}
		}
	}

	running.store(false, Ordering::Release);
	events_tx.close();

	debug!("Every root cycle finished, event stream closed");
}
