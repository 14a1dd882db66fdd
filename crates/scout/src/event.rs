use std::fmt;

use serde::{Deserialize, Serialize};

use super::{entry::FileEntry, error::Error};

/// Kind of an [`Event`], displayed the way log lines and consumers spell it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
	Init,
	#[serde(rename = "CREATE")]
	Created,
	#[serde(rename = "CHANGE")]
	Changed,
	#[serde(rename = "REMOVE")]
	Removed,
	Error,
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Init => "INIT",
			Self::Created => "CREATE",
			Self::Changed => "CHANGE",
			Self::Removed => "REMOVE",
			Self::Error => "ERROR",
		})
	}
}

/// Everything a [`Watcher`](crate::Watcher) delivers on its stream
#[derive(Debug)]
pub enum Event {
	/// Entry found by the first scan of its root
	Init(FileEntry),
	Created(FileEntry),
	Changed(FileEntry),
	/// Carries the last known state of the entry
	Removed(FileEntry),
	/// Failure that couldn't be handled by the walk error policy
	Error { root: String, error: Error },
}

impl Event {
	#[must_use]
	pub const fn kind(&self) -> EventKind {
		match self {
			Self::Init(_) => EventKind::Init,
			Self::Created(_) => EventKind::Created,
			Self::Changed(_) => EventKind::Changed,
			Self::Removed(_) => EventKind::Removed,
			Self::Error { .. } => EventKind::Error,
		}
	}

	#[must_use]
	pub const fn entry(&self) -> Option<&FileEntry> {
		match self {
			Self::Init(entry) | Self::Created(entry) | Self::Changed(entry) | Self::Removed(entry) => {
				Some(entry)
			}
			Self::Error { .. } => None,
		}
	}

	#[must_use]
	pub const fn error(&self) -> Option<&Error> {
		match self {
			Self::Error { error, .. } => Some(error),
			_ => None,
		}
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error { root, error } => write!(f, "{} <root='{root}'>: {error}", self.kind()),
			_ => {
				write!(f, "{}", self.kind())?;
				if let Some(entry) = self.entry() {
					write!(f, " {entry}")?;
				}
				Ok(())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_use_upper_case_names() {
		let names = [
			EventKind::Init,
			EventKind::Created,
			EventKind::Changed,
			EventKind::Removed,
			EventKind::Error,
		]
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>();

		assert_eq!(names, ["INIT", "CREATE", "CHANGE", "REMOVE", "ERROR"]);
		assert_eq!(
			serde_json::to_string(&EventKind::Changed).unwrap(),
			"\"CHANGE\""
		);
		assert_eq!(
			serde_json::from_str::<EventKind>("\"INIT\"").unwrap(),
			EventKind::Init
		);
	}

	#[test]
	fn error_events_have_no_entry() {
		let event = Event::Error {
			root: "/data".to_string(),
			error: Error::Canceled,
		};

		assert_eq!(event.kind(), EventKind::Error);
		assert!(event.entry().is_none());
		assert!(event.error().is_some_and(Error::is_canceled));
		assert_eq!(event.to_string(), "ERROR <root='/data'>: scan canceled");
	}
}
