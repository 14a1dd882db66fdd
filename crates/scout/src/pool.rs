use std::{fmt, num::NonZeroUsize, sync::Arc, thread::available_parallelism};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::{spawn, sync::Semaphore};
use tracing::error;

/// Bounded executor contract: `submit` suspends until a slot is free, then runs the task
/// concurrently with the caller.
#[async_trait]
pub trait BoundedExecutor: Send + Sync + fmt::Debug + 'static {
	async fn submit(&self, task: BoxFuture<'static, ()>);

	/// Maximum number of tasks running at the same time
	fn capacity(&self) -> usize;
}

/// Default [`BoundedExecutor`], every task runs on its own tokio task holding a semaphore permit.
#[derive(Debug, Clone)]
pub struct WorkerPool {
	permits: Arc<Semaphore>,
	capacity: usize,
}

impl WorkerPool {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			permits: Arc::new(Semaphore::new(capacity)),
			capacity,
		}
	}
}

impl Default for WorkerPool {
	fn default() -> Self {
		Self::new(default_worker_count())
	}
}

#[async_trait]
impl BoundedExecutor for WorkerPool {
	async fn submit(&self, task: BoxFuture<'static, ()>) {
		match Arc::clone(&self.permits).acquire_owned().await {
			Ok(permit) => {
				spawn(async move {
					task.await;
					drop(permit);
				});
			}
			Err(e) => error!("Worker pool semaphore closed, dropping task: {e:#?}"),
		}
	}

	fn capacity(&self) -> usize {
		self.capacity
	}
}

/// One worker per available processing unit
#[must_use]
pub fn default_worker_count() -> usize {
	available_parallelism().map_or_else(
		|e| {
			error!("Failed to get available parallelism for the worker pool: {e:#?}");
			1
		},
		NonZeroUsize::get,
	)
}
