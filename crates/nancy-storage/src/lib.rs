//! Read-only filesystem adapter for Nancy.
//!
//! This crate provides a [`Storage`] trait describing the three operations the tree
//! materializer needs from a (possibly merged) source tree:
//!
//! - `stat()` to classify an entry (directory, file, executable, other)
//! - `list_dir()` to enumerate a directory in a stable order
//! - `read()` to load file content as text
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Storage`] trait implemented by every backend
//! - [`FsStorage`] for the local filesystem
//! - [`MockStorage`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use nancy_storage::{FsStorage, Storage};
//!
//! let storage = FsStorage::new();
//! for entry in storage.list_dir(Path::new("site-src"))? {
//!     println!("{} ({:?})", entry.name, entry.kind);
//! }
//! ```

mod fs;
#[cfg(feature = "mock")]
mod mock;
mod storage;

pub use fs::FsStorage;
#[cfg(feature = "mock")]
pub use mock::MockStorage;
pub use storage::{DirEntry, EntryKind, Stat, Storage, StorageError, StorageErrorKind};
