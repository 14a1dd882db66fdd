use std::collections::HashMap;

use tracing::trace;

use super::{
	entry::{ChangeKind, FileEntry},
	event::Event,
	snapshot::Snapshot,
};

/// Differences found by one scan cycle of one root, each list ordered by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleChanges {
	pub created: Vec<FileEntry>,
	pub changed: Vec<FileEntry>,
	pub removed: Vec<FileEntry>,
}

impl CycleChanges {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.created.is_empty() && self.changed.is_empty() && self.removed.is_empty()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.created.len() + self.changed.len() + self.removed.len()
	}

	/// Events in delivery order: creations, then changes, then removals
	pub fn into_events(self) -> impl Iterator<Item = Event> {
		self.created
			.into_iter()
			.map(Event::Created)
			.chain(self.changed.into_iter().map(Event::Changed))
			.chain(self.removed.into_iter().map(Event::Removed))
	}
}

/// Copies known digests into `fresh` for files whose modification time didn't move and returns
/// the paths of files that still need one, ordered by path.
///
/// Directories never get a digest.
pub fn pending_digests(snapshot: &Snapshot, fresh: &mut HashMap<String, FileEntry>) -> Vec<String> {
	let mut pending = fresh
		.iter_mut()
		.filter(|(_, entry)| !entry.is_dir)
		.filter_map(|(path, entry)| match snapshot.get(path) {
			Some(known) if !known.is_dir && known.modified_at == entry.modified_at => {
				entry.digest.clone_from(&known.digest);
				None
			}
			_ => Some(path.clone()),
		})
		.collect::<Vec<_>>();

	pending.sort_unstable();
	pending
}

enum Verdict {
	Created,
	Changed,
	Suppressed(ChangeKind),
	Unchanged(ChangeKind),
}

/// Diffs a fresh listing against `snapshot` and brings the snapshot up to date.
///
/// - paths only in `fresh` are created;
/// - paths only in the snapshot are removed;
/// - files present in both with a different modification time are changed, unless `hashing` is
///   on and both sides carry the same digest, in which case the snapshot just takes the new
///   timestamp;
/// - a path that switched between file and directory is changed;
/// - directories are refreshed silently.
///
/// Running it twice with the same listing yields nothing the second time.
pub fn calculate(
	snapshot: &mut Snapshot,
	fresh: HashMap<String, FileEntry>,
	hashing: bool,
) -> CycleChanges {
	let mut changes = CycleChanges::default();

	let vanished = snapshot
		.paths()
		.filter(|path| !fresh.contains_key(*path))
		.cloned()
		.collect::<Vec<_>>();

	changes.removed = vanished
		.into_iter()
		.filter_map(|path| snapshot.remove(&path))
		.map(|entry| entry.tagged(ChangeKind::Removed))
		.collect();

	for (path, entry) in fresh {
		let verdict = match snapshot.get(&path) {
			None => Verdict::Created,
			Some(known) if known.is_dir != entry.is_dir => Verdict::Changed,
			Some(known) if entry.is_dir || known.modified_at == entry.modified_at => {
				Verdict::Unchanged(known.change)
			}
			Some(known) if hashing && entry.digest.is_some() && entry.digest == known.digest => {
				Verdict::Suppressed(known.change)
			}
			Some(_) => Verdict::Changed,
		};

		match verdict {
			Verdict::Created => {
				let entry = entry.tagged(ChangeKind::Created);
				snapshot.insert(entry.clone());
				changes.created.push(entry);
			}
			Verdict::Changed => {
				let entry = entry.tagged(ChangeKind::Changed);
				snapshot.insert(entry.clone());
				changes.changed.push(entry);
			}
			Verdict::Suppressed(previous) => {
				trace!(%path, "Modification time moved but content digest is the same");
				snapshot.insert(entry.tagged(previous));
			}
			Verdict::Unchanged(previous) => {
				snapshot.insert(entry.tagged(previous));
			}
		}
	}

	changes.created.sort_unstable_by(|a, b| a.path.cmp(&b.path));
	changes.changed.sort_unstable_by(|a, b| a.path.cmp(&b.path));
	changes.removed.sort_unstable_by(|a, b| a.path.cmp(&b.path));

	changes
}
