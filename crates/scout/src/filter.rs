//! Per-entry filter and walk error policies applied while walking a root.

use scout_utils::error::NonUtf8PathError;

use std::{fmt, fs::Metadata, io, sync::Arc};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{trace, warn};

use super::Error;

/// Decision taken by a filter for a single walked entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDecision {
	/// Keep the entry (and walk into it, if it is a directory)
	Include,
	/// Leave the entry out of the result, directories are still walked into
	SkipEntry,
	/// Leave the entry out and never walk below it
	SkipSubtree,
	/// Stop the whole walk, keeping what was collected so far
	SkipAll,
}

/// Decision taken by the error handler when the walker fails to read something
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkErrorDecision {
	/// Ignore the failing entry and keep walking
	Skip,
	/// Ignore the failing entry and anything below it
	SkipSubtree,
	/// Stop the whole walk, keeping what was collected so far
	SkipAll,
	/// Abort the walk, the error becomes fatal for this scan
	Fail,
}

pub type FilterFn = dyn Fn(&str, &Metadata) -> FilterDecision + Send + Sync;
pub type WalkErrorFn = dyn Fn(&str, Option<&Metadata>, &io::Error) -> WalkErrorDecision + Send + Sync;

/// Optional overrides for the walk policies, both default to a permissive pass-through
#[derive(Clone)]
pub struct Callbacks {
	filter: Arc<FilterFn>,
	on_walk_error: Arc<WalkErrorFn>,
}

impl Default for Callbacks {
	fn default() -> Self {
		Self {
			filter: Arc::new(include_all),
			on_walk_error: Arc::new(skip_missing_or_forbidden),
		}
	}
}

impl fmt::Debug for Callbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callbacks").finish_non_exhaustive()
	}
}

impl Callbacks {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_filter(
		mut self,
		filter: impl Fn(&str, &Metadata) -> FilterDecision + Send + Sync + 'static,
	) -> Self {
		self.filter = Arc::new(filter);
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
		self.on_walk_error = Arc::new(on_walk_error);
		self
	}

	pub(crate) fn filter(&self, path: &str, metadata: &Metadata) -> FilterDecision {
		(self.filter)(path, metadata)
	}

	pub(crate) fn on_walk_error(
		&self,
		path: &str,
		metadata: Option<&Metadata>,
		error: &io::Error,
	) -> WalkErrorDecision {
		(self.on_walk_error)(path, metadata, error)
	}
}

/// Default filter, keeps everything
#[must_use]
pub const fn include_all(_path: &str, _metadata: &Metadata) -> FilterDecision {
	FilterDecision::Include
}

/// Default error handler: entries that vanished mid walk, that we aren't allowed to read or whose
/// name isn't valid UTF-8 are skipped, anything else aborts the walk.
#[must_use]
pub fn skip_missing_or_forbidden(
	path: &str,
	_metadata: Option<&Metadata>,
	error: &io::Error,
) -> WalkErrorDecision {
	match error.kind() {
		io::ErrorKind::NotFound => {
			trace!(%path, "Skipping entry that vanished while walking");
			WalkErrorDecision::Skip
		}
		io::ErrorKind::PermissionDenied => {
			warn!(%path, "Skipping entry without read permission");
			WalkErrorDecision::SkipSubtree
		}
		io::ErrorKind::InvalidData
			if error
				.get_ref()
				.is_some_and(|inner| inner.is::<NonUtf8PathError>()) =>
		{
			warn!(%path, "Skipping entry with a non UTF-8 name");
			WalkErrorDecision::SkipSubtree
		}
		_ => WalkErrorDecision::Fail,
	}
}

/// Skips dot-prefixed entries, pruning hidden directories entirely
#[must_use]
pub fn skip_hidden(path: &str, metadata: &Metadata) -> FilterDecision {
	let name = path.rsplit('/').next().unwrap_or(path);

	if name.starts_with('.') && name != "." && name != ".." {
		if metadata.is_dir() {
			FilterDecision::SkipSubtree
		} else {
			FilterDecision::SkipEntry
		}
	} else {
		FilterDecision::Include
	}
}

/// Filter driven by glob patterns matched against normalized paths.
///
/// A directory matching a reject glob is pruned with all its children. Accept globs only apply
/// to files: when present, files matching none of them are left out. In case of doubt about
/// globs, consult <https://docs.rs/globset/latest/globset/#syntax>
#[derive(Debug, Clone, Default)]
pub struct GlobFilter {
	reject: Option<GlobSet>,
	accept: Option<GlobSet>,
}

impl GlobFilter {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reject(
		mut self,
		globs_str: impl IntoIterator<Item = impl AsRef<str>>,
	) -> Result<Self, Error> {
		self.reject = Some(build_glob_set(globs_str)?);
		Ok(self)
	}

	pub fn accept(
		mut self,
		globs_str: impl IntoIterator<Item = impl AsRef<str>>,
	) -> Result<Self, Error> {
		self.accept = Some(build_glob_set(globs_str)?);
		Ok(self)
	}

	#[must_use]
	pub fn decide(&self, path: &str, metadata: &Metadata) -> FilterDecision {
		let is_dir = metadata.is_dir();

		if self
			.reject
			.as_ref()
			.is_some_and(|reject_glob_set| reject_glob_set.is_match(path))
		{
			trace!(%path, "Path rejected by glob");
			return if is_dir {
				FilterDecision::SkipSubtree
			} else {
				FilterDecision::SkipEntry
			};
		}

		if !is_dir
			&& self
				.accept
				.as_ref()
				.is_some_and(|accept_glob_set| !accept_glob_set.is_match(path))
		{
			trace!(%path, "Path didn't pass any accept glob");
			return FilterDecision::SkipEntry;
		}

		FilterDecision::Include
	}

	/// Turns this filter into a closure ready for [`Callbacks::with_filter`]
	#[must_use]
	pub fn into_filter(self) -> impl Fn(&str, &Metadata) -> FilterDecision + Send + Sync + 'static {
		move |path, metadata| self.decide(path, metadata)
	}
}

fn build_glob_set(globs_str: impl IntoIterator<Item = impl AsRef<str>>) -> Result<GlobSet, Error> {
	globs_str
		.into_iter()
		.map(|s| s.as_ref().parse::<Glob>())
		.collect::<Result<Vec<_>, _>>()
		.and_then(|globs| {
			globs
				.into_iter()
				.fold(&mut GlobSetBuilder::new(), |builder, glob| builder.add(glob))
				.build()
		})
		.map_err(Into::into)
}

#[cfg(test)]
mod tests {
	use super::*;

	use tempfile::{tempdir, TempDir};

	fn fixture() -> (TempDir, Metadata, Metadata) {
		let dir = tempdir().unwrap();
		let file_path = dir.path().join("file.txt");
		std::fs::write(&file_path, b"content").unwrap();

		let dir_metadata = std::fs::metadata(dir.path()).unwrap();
		let file_metadata = std::fs::metadata(file_path).unwrap();

		(dir, dir_metadata, file_metadata)
	}

	#[test]
	fn hidden_entries() {
		let (_dir, dir_md, file_md) = fixture();

		assert_eq!(skip_hidden("/data/.git", &dir_md), FilterDecision::SkipSubtree);
		assert_eq!(skip_hidden("/data/.env", &file_md), FilterDecision::SkipEntry);
		assert_eq!(skip_hidden("/data/src", &dir_md), FilterDecision::Include);
		assert_eq!(skip_hidden(".", &dir_md), FilterDecision::Include);
		assert_eq!(skip_hidden("../data", &dir_md), FilterDecision::Include);
	}

	#[test]
	fn default_error_policy() {
		let not_found = io::Error::from(io::ErrorKind::NotFound);
		let forbidden = io::Error::from(io::ErrorKind::PermissionDenied);
		let broken = io::Error::from(io::ErrorKind::InvalidData);
		let non_utf8 = io::Error::new(
			io::ErrorKind::InvalidData,
			NonUtf8PathError(std::path::Path::new("/data/bad").into()),
		);

		assert_eq!(
			skip_missing_or_forbidden("/data/a", None, &not_found),
			WalkErrorDecision::Skip
		);
		assert_eq!(
			skip_missing_or_forbidden("/data/a", None, &forbidden),
			WalkErrorDecision::SkipSubtree
		);
		assert_eq!(
			skip_missing_or_forbidden("/data/a", None, &non_utf8),
			WalkErrorDecision::SkipSubtree
		);
		assert_eq!(
			skip_missing_or_forbidden("/data/a", None, &broken),
			WalkErrorDecision::Fail
		);
	}

	#[test]
	fn reject_globs_prune_directories() {
		let (_dir, dir_md, file_md) = fixture();
		let filter = GlobFilter::new()
			.reject(["**/node_modules", "**/*.tmp"])
			.unwrap();

		assert_eq!(
			filter.decide("/project/node_modules", &dir_md),
			FilterDecision::SkipSubtree
		);
		assert_eq!(
			filter.decide("/project/notes.tmp", &file_md),
			FilterDecision::SkipEntry
		);
		assert_eq!(
			filter.decide("/project/src/main.rs", &file_md),
			FilterDecision::Include
		);
	}

	#[test]
	fn accept_globs_only_apply_to_files() {
		let (_dir, dir_md, file_md) = fixture();
		let filter = GlobFilter::new()
			.accept(["{*.png,*.jpg,*.jpeg}"])
			.unwrap();

		assert_eq!(filter.decide("/photos", &dir_md), FilterDecision::Include);
		assert_eq!(
			filter.decide("/photos/photo1.png", &file_md),
			FilterDecision::Include
		);
		assert_eq!(
			filter.decide("/photos/text.txt", &file_md),
			FilterDecision::SkipEntry
		);
	}

	#[test]
	fn invalid_glob_is_reported() {
		assert!(matches!(
			GlobFilter::new().reject(["a[b"]),
			Err(Error::Glob(_))
		));
	}
}
