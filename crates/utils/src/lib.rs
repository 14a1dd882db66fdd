#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::path::Path;

pub mod error;

use error::NonUtf8PathError;

/// Turns a filesystem path into the key used by snapshots: forward slashes only,
/// no repeated separators and no trailing separator (except for a bare root).
pub fn normalize_path(path: impl AsRef<Path>) -> Result<String, NonUtf8PathError> {
	let path = path.as_ref();
	let raw = path
		.to_str()
		.ok_or_else(|| NonUtf8PathError(path.into()))?;

	Ok(normalize_str(raw))
}

/// Same as [`normalize_path`] but for an already valid UTF-8 string.
#[must_use]
pub fn normalize_str(raw: &str) -> String {
	let mut normalized = String::with_capacity(raw.len());
	let mut last_was_slash = false;

	for c in raw.chars() {
		let c = if c == '\\' { '/' } else { c };
		if c == '/' {
			if last_was_slash {
				continue;
			}
			last_was_slash = true;
		} else {
			last_was_slash = false;
		}
		normalized.push(c);
	}

	while normalized.len() > 1 && normalized.ends_with('/') && !is_drive_root(&normalized) {
		normalized.pop();
	}

	normalized
}

/// `C:/` style keys, dropping their slash would point at the drive's current directory
fn is_drive_root(normalized: &str) -> bool {
	let bytes = normalized.as_bytes();
	bytes.len() == 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}
