use std::collections::{hash_map, HashMap};

use super::entry::FileEntry;

/// In-memory picture of one root as of its last completed cycle, keyed by normalized path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
	root: String,
	entries: HashMap<String, FileEntry>,
}

impl Snapshot {
	#[must_use]
	pub fn new(root: impl Into<String>) -> Self {
		Self {
			root: root.into(),
			entries: HashMap::new(),
		}
	}

	#[must_use]
	pub fn root(&self) -> &str {
		&self.root
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	#[must_use]
	pub fn get(&self, path: &str) -> Option<&FileEntry> {
		self.entries.get(path)
	}

	#[must_use]
	pub fn contains(&self, path: &str) -> bool {
		self.entries.contains_key(path)
	}

	pub fn iter(&self) -> hash_map::Values<'_, String, FileEntry> {
		self.entries.values()
	}

	pub fn paths(&self) -> hash_map::Keys<'_, String, FileEntry> {
		self.entries.keys()
	}

	/// Entries ordered by path
	#[must_use]
	pub fn sorted(&self) -> Vec<&FileEntry> {
		let mut entries = self.entries.values().collect::<Vec<_>>();
		entries.sort_unstable_by(|a, b| a.path.cmp(&b.path));
		entries
	}

	/// Inserts or replaces the entry stored under `entry.path`
	pub fn insert(&mut self, entry: FileEntry) -> Option<FileEntry> {
		self.entries.insert(entry.path.clone(), entry)
	}

	pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
		self.entries.remove(path)
	}

	/// Replaces the whole content, used by the first scan of a root
	pub fn replace_all(&mut self, entries: HashMap<String, FileEntry>) {
		self.entries = entries;
	}
}

impl<'a> IntoIterator for &'a Snapshot {
	type Item = &'a FileEntry;
	type IntoIter = hash_map::Values<'a, String, FileEntry>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
