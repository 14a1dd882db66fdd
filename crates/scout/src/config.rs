use scout_utils::normalize_path;

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::{pool::default_worker_count, Error};

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

/// Engine configuration. Once handed to a [`Watcher`](crate::Watcher) it can't be changed anymore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Roots to watch, each one may be a single file or a directory tree
	pub paths: Vec<PathBuf>,
	/// Sleep between two cycles of the same root
	pub scan_interval: Duration,
	/// Confirm suspected changes by comparing content digests
	pub enable_content_hash: bool,
	/// Capacity of the event queue, producers wait when it is full
	pub event_queue_capacity: usize,
	/// Maximum number of digests computed at the same time across all roots
	pub worker_count: usize,
	/// When a root fails during its cycles, stop every other root too
	pub fail_fast: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			paths: Vec::new(),
			scan_interval: DEFAULT_SCAN_INTERVAL,
			enable_content_hash: false,
			event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
			worker_count: default_worker_count(),
			fail_fast: false,
		}
	}
}

impl Config {
	pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
		Self {
			paths: paths.into_iter().map(Into::into).collect(),
			..Default::default()
		}
	}

	#[must_use]
	pub const fn with_scan_interval(mut self, scan_interval: Duration) -> Self {
		self.scan_interval = scan_interval;
		self
	}

	#[must_use]
	pub const fn with_content_hash(mut self, enable: bool) -> Self {
		self.enable_content_hash = enable;
		self
	}

	#[must_use]
	pub const fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
		self.event_queue_capacity = capacity;
		self
	}

	#[must_use]
	pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
		self.worker_count = worker_count;
		self
	}

	#[must_use]
	pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
		self.fail_fast = fail_fast;
		self
	}

	/// Checks every numeric knob and returns the normalized, deduplicated roots.
	///
	/// Root existence is only checked when the watcher starts.
	pub(crate) fn validate(&self) -> Result<Vec<String>, Error> {
		if self.paths.is_empty() {
			return Err(Error::NoPaths);
		}

		if self.scan_interval.is_zero() {
			return Err(Error::ZeroInterval);
		}

		if self.worker_count == 0 {
			return Err(Error::ZeroWorkers);
		}

		if self.event_queue_capacity == 0 {
			return Err(Error::ZeroCapacity);
		}

		let mut roots = Vec::with_capacity(self.paths.len());
		for path in &self.paths {
			let root = normalize_path(path)?;
			if !roots.contains(&root) {
				roots.push(root);
			}
		}

		Ok(roots)
	}
}
