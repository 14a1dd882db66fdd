use scout_utils::{
	error::{FileIOError, NonUtf8PathError},
	normalize_path,
};

use std::{
	fs::Metadata,
	io,
	path::{Path, PathBuf},
};

use tokio::fs;
use tokio_stream::{wrappers::ReadDirStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{
	entry::FileEntry,
	filter::{Callbacks, FilterDecision, WalkErrorDecision},
	Error,
};

/// What to do after the error handler had its say
enum Flow {
	Continue,
	Stop,
}

fn handle_walk_error(
	callbacks: &Callbacks,
	path: &str,
	metadata: Option<&Metadata>,
	error: io::Error,
) -> Result<Flow, Error> {
	match callbacks.on_walk_error(path, metadata, &error) {
		WalkErrorDecision::Skip | WalkErrorDecision::SkipSubtree => Ok(Flow::Continue),
		WalkErrorDecision::SkipAll => Ok(Flow::Stop),
		WalkErrorDecision::Fail => Err(Error::Walk(FileIOError::from((path, error)))),
	}
}

/// Walks `root` depth first, root included, honoring the filter and error policies.
///
/// Children of a directory are visited in name order, so two walks over an unchanged tree
/// produce the same sequence. Symbolic links are reported but never followed, only the root
/// itself is resolved. The walk gives up with [`Error::Canceled`] as soon as `cancel` is tripped.
pub async fn walk(
	root: &str,
	callbacks: &Callbacks,
	cancel: Option<&CancellationToken>,
) -> Result<Vec<FileEntry>, Error> {
	let mut entries = Vec::new();
	let mut to_walk = vec![PathBuf::from(root)];
	let mut is_root = true;

	while let Some(current_path) = to_walk.pop() {
		if cancel.is_some_and(CancellationToken::is_cancelled) {
			debug!(%root, "Walk canceled");
			return Err(Error::Canceled);
		}

		let path = match normalize_path(&current_path) {
			Ok(path) => path,
			Err(NonUtf8PathError(bad_path)) => {
				let lossy = bad_path.to_string_lossy().into_owned();
				let error = io::Error::new(
					io::ErrorKind::InvalidData,
					NonUtf8PathError(bad_path),
				);
				match handle_walk_error(callbacks, &lossy, None, error)? {
					Flow::Continue => continue,
					Flow::Stop => break,
				}
			}
		};

		let metadata_res = if is_root {
			fs::metadata(&current_path).await
		} else {
			fs::symlink_metadata(&current_path).await
		};
		is_root = false;

		let metadata = match metadata_res {
			Ok(metadata) => metadata,
			Err(e) => match handle_walk_error(callbacks, &path, None, e)? {
				Flow::Continue => continue,
				Flow::Stop => break,
			},
		};

		match callbacks.filter(&path, &metadata) {
			FilterDecision::Include => {
				trace!(%path, "Entry accepted");
			}
			FilterDecision::SkipEntry => {
				trace!(%path, "Entry skipped by filter");
				if metadata.is_dir() {
					if let Flow::Stop =
						push_children(&current_path, &path, &metadata, callbacks, &mut to_walk)
							.await?
					{
						break;
					}
				}
				continue;
			}
			FilterDecision::SkipSubtree => {
				trace!(%path, "Subtree pruned by filter");
				continue;
			}
			FilterDecision::SkipAll => {
				debug!(%path, "Filter requested to stop walking");
				break;
			}
		}

		let is_dir = metadata.is_dir();
		entries.push(FileEntry::from_metadata(path.clone(), &metadata));

		if is_dir {
			if let Flow::Stop =
				push_children(&current_path, &path, &metadata, callbacks, &mut to_walk).await?
			{
				break;
			}
		}
	}

	Ok(entries)
}

async fn push_children(
	dir_path: &Path,
	dir: &str,
	metadata: &Metadata,
	callbacks: &Callbacks,
	to_walk: &mut Vec<PathBuf>,
) -> Result<Flow, Error> {
	let mut read_dir_stream = match fs::read_dir(dir_path).await {
		Ok(read_dir) => ReadDirStream::new(read_dir),
		Err(e) => return handle_walk_error(callbacks, dir, Some(metadata), e),
	};

	let mut children = Vec::new();
	while let Some(res) = read_dir_stream.next().await {
		match res {
			Ok(dir_entry) => children.push(dir_entry.path()),
			Err(e) => {
				if let Flow::Stop = handle_walk_error(callbacks, dir, Some(metadata), e)? {
					return Ok(Flow::Stop);
				}
				// The stream can't be trusted anymore after a failure
				break;
			}
		}
	}

	// Reverse order as we pop from the back of the stack
	children.sort_unstable_by(|a, b| b.file_name().cmp(&a.file_name()));
	to_walk.extend(children);

	Ok(Flow::Continue)
}
