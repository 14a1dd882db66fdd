use std::{
	fmt,
	fs::Metadata,
	path::Path,
	time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag assigned to an entry while diffing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
	#[default]
	None,
	Created,
	Changed,
	Removed,
}

/// Hex encoded content digest of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
	#[must_use]
	pub fn new(hex: impl Into<String>) -> Self {
		Self(hex.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Digest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// `FileEntry` represents a single filesystem object as seen by the last scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
	/// Normalized path, also the key of this entry inside a [`Snapshot`](crate::Snapshot)
	pub path: String,
	pub name: String,
	pub size: u64,
	pub mode: u32,
	pub modified_at: DateTime<Utc>,
	pub is_dir: bool,
	pub digest: Option<Digest>,
	pub change: ChangeKind,
}

impl FileEntry {
	/// Builds an entry from an already normalized path and its metadata.
	#[must_use]
	pub fn from_metadata(path: String, metadata: &Metadata) -> Self {
		Self {
			name: entry_name(&path),
			size: metadata.len(),
			mode: mode_bits(metadata),
			modified_at: metadata.modified().unwrap_or(UNIX_EPOCH).into(),
			is_dir: metadata.is_dir(),
			digest: None,
			change: ChangeKind::None,
			path,
		}
	}

	#[must_use]
	pub fn modified_system_time(&self) -> SystemTime {
		self.modified_at.into()
	}

	pub(crate) fn tagged(mut self, change: ChangeKind) -> Self {
		self.change = change;
		self
	}
}

impl fmt::Display for FileEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} <kind='{}', size={}, mode={:o}, modified='{}'",
			self.path,
			if self.is_dir { "dir" } else { "file" },
			self.size,
			self.mode,
			self.modified_at.to_rfc3339(),
		)?;

		if let Some(digest) = &self.digest {
			write!(f, ", digest='{digest}'")?;
		}

		f.write_str(">")
	}
}

fn entry_name(path: &str) -> String {
	Path::new(path)
		.file_name()
		.map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned())
}

fn mode_bits(metadata: &Metadata) -> u32 {
	#[cfg(target_family = "unix")]
	{
		use std::os::unix::fs::PermissionsExt;

		metadata.permissions().mode()
	}

	#[cfg(not(target_family = "unix"))]
	{
		// Only the read-only attribute is available here
		if metadata.permissions().readonly() {
			0o444
		} else {
			0o666
		}
	}
}
