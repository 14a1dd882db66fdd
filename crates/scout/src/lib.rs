//!
//! # Scout
//!
//! A polling filesystem change detector. Scout keeps an in-memory snapshot of every configured
//! root and, on a fixed interval, walks each root again and diffs the fresh listing against that
//! snapshot. The outcome is delivered as a single ordered stream of [`Event`]s:
//! - [`Event::Init`] once per entry found by the first scan;
//! - [`Event::Created`], [`Event::Changed`] and [`Event::Removed`] for every later difference;
//! - [`Event::Error`] for failures that can't be recovered locally.
//!
//! Modification times are compared with full nanosecond precision. When content hashing is
//! enabled, a file whose timestamp moved but whose bytes are identical is not reported, the
//! snapshot just picks up the new timestamp.
//!
//! ## Basic example
//!
//! ```no_run
//! use scout::{Config, Event, Watcher};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), scout::Error> {
//!     let watcher = Watcher::new(
//!         Config::new(["/data"])
//!             .with_scan_interval(Duration::from_millis(500))
//!             .with_content_hash(true),
//!     )?;
//!
//!     let events = watcher.start().await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             Event::Init(entry) => println!("tracking {entry}"),
//!             Event::Created(entry) => println!("created {entry}"),
//!             Event::Changed(entry) => println!("changed {entry}"),
//!             Event::Removed(entry) => println!("removed {entry}"),
//!             Event::Error { root, error } => eprintln!("{root}: {error}"),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

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

mod config;
mod diff;
mod engine;
mod entry;
mod error;
mod event;
pub mod filter;
mod hasher;
mod pool;
mod snapshot;
mod walker;

pub use config::{Config, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_SCAN_INTERVAL};
pub use diff::{calculate, pending_digests, CycleChanges};
pub use engine::{Watcher, WatcherBuilder};
pub use entry::{ChangeKind, Digest, FileEntry};
pub use error::Error;
pub use event::{Event, EventKind};
pub use filter::{Callbacks, FilterDecision, WalkErrorDecision};
pub use hasher::{confirm_digests, Blake3Hasher, ContentHasher};
pub use pool::{default_worker_count, BoundedExecutor, WorkerPool};
pub use snapshot::Snapshot;
pub use walker::walk;
