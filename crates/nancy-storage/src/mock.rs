//! Mock storage implementation for testing.
//!
//! Provides [`MockStorage`] for unit testing without filesystem access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::storage::{DirEntry, EntryKind, Stat, Storage, StorageError, StorageErrorKind};

/// Backend identifier for error messages.
const BACKEND: &str = "Mock";

#[derive(Debug)]
enum MockEntry {
    Directory(Vec<String>),
    File { kind: EntryKind, content: String },
}

/// Mock storage for testing.
///
/// Holds an in-memory tree. Parent directories are created on demand, and
/// directories list their entries in insertion order so tests can pin the
/// materializer's ordering rules independently of any sorting.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use nancy_storage::{MockStorage, Storage};
///
/// let storage = MockStorage::new()
///     .with_file("/src/index.xhtml", "<p>Home</p>")
///     .with_dir("/src/people");
///
/// let listing = storage.list_dir(Path::new("/src")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockStorage {
    entries: HashMap<PathBuf, MockEntry>,
}

impl MockStorage {
    /// Create a new empty mock storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory (and any missing parents).
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.ensure_dir(&path.into());
        self
    }

    /// Add a regular file with the given content.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.with_entry(path.into(), EntryKind::File, content.into())
    }

    /// Add an executable file with the given content.
    #[must_use]
    pub fn with_executable(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.with_entry(path.into(), EntryKind::Executable, content.into())
    }

    /// Add an entry that is neither a file nor a directory (e.g. a socket).
    #[must_use]
    pub fn with_special(self, path: impl Into<PathBuf>) -> Self {
        self.with_entry(path.into(), EntryKind::Other, String::new())
    }

    fn with_entry(mut self, path: PathBuf, kind: EntryKind, content: String) -> Self {
        self.link_into_parent(&path);
        self.entries.insert(path, MockEntry::File { kind, content });
        self
    }

    fn ensure_dir(&mut self, path: &Path) {
        if self.entries.contains_key(path) {
            return;
        }
        self.link_into_parent(path);
        self.entries
            .insert(path.to_path_buf(), MockEntry::Directory(Vec::new()));
    }

    fn link_into_parent(&mut self, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if parent.as_os_str().is_empty() {
            return;
        }
        self.ensure_dir(parent);
        let name = name.to_string_lossy().into_owned();
        if let Some(MockEntry::Directory(children)) = self.entries.get_mut(parent)
            && !children.contains(&name)
        {
            children.push(name);
        }
    }

    fn kind_of(entry: &MockEntry) -> EntryKind {
        match entry {
            MockEntry::Directory(_) => EntryKind::Directory,
            MockEntry::File { kind, .. } => *kind,
        }
    }

    fn lookup(&self, path: &Path) -> Result<&MockEntry, StorageError> {
        self.entries
            .get(path)
            .ok_or_else(|| StorageError::not_found(path).with_backend(BACKEND))
    }
}

impl Storage for MockStorage {
    fn stat(&self, path: &Path) -> Result<Stat, StorageError> {
        self.lookup(path).map(|entry| Stat::new(Self::kind_of(entry)))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        match self.lookup(path)? {
            MockEntry::Directory(children) => Ok(children
                .iter()
                .map(|name| {
                    let kind = self
                        .entries
                        .get(&path.join(name))
                        .map_or(EntryKind::Other, Self::kind_of);
                    DirEntry::new(name.clone(), kind)
                })
                .collect()),
            MockEntry::File { .. } => Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND)),
        }
    }

    fn read(&self, path: &Path) -> Result<String, StorageError> {
        match self.lookup(path)? {
            MockEntry::File { content, .. } => Ok(content.clone()),
            MockEntry::Directory(_) => Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parents_created_on_demand() {
        let storage = MockStorage::new().with_file("/src/people/alice.xhtml", "<p/>");

        assert!(storage.stat(Path::new("/src")).unwrap().is_directory());
        assert!(storage.stat(Path::new("/src/people")).unwrap().is_directory());
        assert!(storage.stat(Path::new("/src/people/alice.xhtml")).unwrap().is_file());
    }

    #[test]
    fn test_list_dir_preserves_insertion_order() {
        let storage = MockStorage::new()
            .with_file("/src/z.xhtml", "")
            .with_dir("/src/b")
            .with_executable("/src/a.sh", "#!/bin/sh");

        let listing = storage.list_dir(Path::new("/src")).unwrap();

        assert_eq!(
            listing,
            vec![
                DirEntry::new("z.xhtml", EntryKind::File),
                DirEntry::new("b", EntryKind::Directory),
                DirEntry::new("a.sh", EntryKind::Executable),
            ]
        );
    }

    #[test]
    fn test_read_content() {
        let storage = MockStorage::new().with_file("/src/a.xhtml", "<p>A</p>");

        assert_eq!(storage.read(Path::new("/src/a.xhtml")).unwrap(), "<p>A</p>");
    }

    #[test]
    fn test_read_directory_fails() {
        let storage = MockStorage::new().with_dir("/src");
        let err = storage.read(Path::new("/src")).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidPath);
    }

    #[test]
    fn test_missing_entry() {
        let storage = MockStorage::new();
        let err = storage.stat(Path::new("/missing")).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.to_string(), "[Mock] Not found (path: /missing)");
    }
}
