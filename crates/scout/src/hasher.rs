use scout_utils::error::FileIOError;

use std::{collections::HashMap, fmt, io, path::Path, sync::Arc};

use async_channel as chan;
use async_trait::async_trait;
use tokio::{fs::File, io::AsyncReadExt};
use tracing::{error, trace, warn};

use super::{entry::Digest, pool::BoundedExecutor, FileEntry, Error};

const CHUNK_SIZE: usize = 64 * 1024;

/// Computes a digest of a file's full content
#[async_trait]
pub trait ContentHasher: Send + Sync + fmt::Debug + 'static {
	async fn digest(&self, path: &Path) -> Result<Digest, io::Error>;
}

/// BLAKE3 over the whole file, hex encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

#[async_trait]
impl ContentHasher for Blake3Hasher {
	async fn digest(&self, path: &Path) -> Result<Digest, io::Error> {
		let mut file = File::open(path).await?;
		let mut hasher = blake3::Hasher::new();
		let mut buf = vec![0u8; CHUNK_SIZE];

		loop {
			let read = file.read(&mut buf).await?;
			if read == 0 {
				break;
			}
			hasher.update(&buf[..read]);
		}

		Ok(Digest::new(hasher.finalize().to_hex().as_str()))
	}
}

/// Hashes every `pending` path through `executor` and stores the digests in `fresh`.
///
/// Files that vanished before they could be read are dropped from `fresh`, so the diff sees them
/// as removed (or never created). Any other failure leaves the entry without a digest and is
/// returned to be reported.
pub async fn confirm_digests(
	hasher: &Arc<dyn ContentHasher>,
	executor: &dyn BoundedExecutor,
	fresh: &mut HashMap<String, FileEntry>,
	pending: Vec<String>,
) -> Vec<Error> {
	if pending.is_empty() {
		return Vec::new();
	}

	trace!(count = pending.len(), "Computing content digests");

	let (results_tx, results_rx) = chan::unbounded();

	for path in pending {
		let results_tx = results_tx.clone();
		let hasher = Arc::clone(hasher);

		executor
			.submit(Box::pin(async move {
				let res = hasher.digest(Path::new(&path)).await;
				if results_tx.send((path, res)).await.is_err() {
					error!("Digest results receiver dropped");
				}
			}))
			.await;
	}

	drop(results_tx);

	let mut errors = Vec::new();

	while let Ok((path, res)) = results_rx.recv().await {
		match res {
			Ok(digest) => {
				if let Some(entry) = fresh.get_mut(&path) {
					entry.digest = Some(digest);
				}
			}

			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				warn!(%path, "File vanished before its digest was computed, treating as removed");
				fresh.remove(&path);
			}

			Err(e) => {
				warn!(%path, "Failed to compute content digest: {e:#}");
				errors.push(Error::Hash(FileIOError::from((
					&path,
					e,
					"computing content digest",
				))));
			}
		}
	}

	errors
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::pool::WorkerPool;

	use tempfile::tempdir;
	use tokio::fs;
	use tracing_test::traced_test;

	#[tokio::test]
	async fn same_bytes_same_digest() {
		let dir = tempdir().unwrap();
		let a = dir.path().join("a.txt");
		let b = dir.path().join("b.txt");
		let c = dir.path().join("c.txt");

		fs::write(&a, b"same content").await.unwrap();
		fs::write(&b, b"same content").await.unwrap();
		fs::write(&c, b"other content").await.unwrap();

		let hasher = Blake3Hasher;
		let digest_a = hasher.digest(&a).await.unwrap();

		assert_eq!(digest_a, hasher.digest(&b).await.unwrap());
		assert_ne!(digest_a, hasher.digest(&c).await.unwrap());
		assert_eq!(
			digest_a.as_str(),
			blake3::hash(b"same content").to_hex().as_str()
		);
	}

	#[tokio::test]
	async fn big_files_are_streamed() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("big.bin");
		let content = (0..CHUNK_SIZE * 3 + 17)
			.map(|i| u8::try_from(i % 251).unwrap())
			.collect::<Vec<_>>();
		fs::write(&path, &content).await.unwrap();

		assert_eq!(
			Blake3Hasher.digest(&path).await.unwrap().as_str(),
			blake3::hash(&content).to_hex().as_str()
		);
	}

	#[tokio::test]
	#[traced_test]
	async fn vanished_files_are_dropped_from_the_fresh_listing() {
		let dir = tempdir().unwrap();
		let kept = dir.path().join("kept.txt");
		fs::write(&kept, b"kept").await.unwrap();
		let metadata = fs::metadata(&kept).await.unwrap();

		let kept_key = kept.to_str().unwrap().to_string();
		let gone_key = dir.path().join("gone.txt").to_str().unwrap().to_string();

		let mut fresh = HashMap::from([
			(
				kept_key.clone(),
				FileEntry::from_metadata(kept_key.clone(), &metadata),
			),
			(
				gone_key.clone(),
				FileEntry::from_metadata(gone_key.clone(), &metadata),
			),
		]);

		let hasher: Arc<dyn ContentHasher> = Arc::new(Blake3Hasher);
		let errors = confirm_digests(
			&hasher,
			&WorkerPool::new(2),
			&mut fresh,
			vec![kept_key.clone(), gone_key.clone()],
		)
		.await;

		assert!(errors.is_empty());
		assert!(!fresh.contains_key(&gone_key));
		assert_eq!(
			fresh[&kept_key].digest.as_ref().map(Digest::as_str),
			Some(blake3::hash(b"kept").to_hex().as_str())
		);
	}
}
