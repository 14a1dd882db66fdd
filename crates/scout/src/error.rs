use scout_utils::error::{FileIOError, NonUtf8PathError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	// Configuration errors
	#[error("no paths to watch were configured")]
	NoPaths,
	#[error("root path can't be watched: {0}")]
	RootNotFound(FileIOError),
	#[error("scan interval must be greater than zero")]
	ZeroInterval,
	#[error("worker count must be greater than zero")]
	ZeroWorkers,
	#[error("event queue capacity must be greater than zero")]
	ZeroCapacity,
	#[error("glob builder error: {0}")]
	Glob(#[from] globset::Error),
	#[error(transparent)]
	NonUtf8Path(#[from] NonUtf8PathError),

	// Lifecycle errors
	#[error("watcher was already started")]
	AlreadyStarted,
	#[error("initial scan failed <root='{root}'>: {source}")]
	InitialScan {
		root: String,
		#[source]
		source: Box<Error>,
	},
	#[error("scan canceled")]
	Canceled,
	#[error("cycle task for <root='{0}'> panicked or was aborted")]
	CycleJoin(String),

	// Runtime errors
	#[error("walk failed: {0}")]
	Walk(FileIOError),
	#[error("content digest failed: {0}")]
	Hash(FileIOError),
}

impl Error {
	/// `true` for errors caused by a sibling root tripping the shared cancellation signal.
	#[must_use]
	pub const fn is_canceled(&self) -> bool {
		matches!(self, Self::Canceled)
	}
}
