//! Filesystem storage implementation.
//!
//! Provides [`FsStorage`] for reading source trees from the local filesystem.

use std::fs;
use std::path::Path;

use crate::storage::{DirEntry, EntryKind, Stat, Storage, StorageError};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Filesystem storage implementation.
///
/// Symlinks are followed, so a link to a directory is listed as a directory.
/// Directory listings are sorted by name, which keeps builds reproducible
/// regardless of the order the operating system returns entries in.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use nancy_storage::{FsStorage, Storage};
///
/// let storage = FsStorage::new();
/// let stat = storage.stat(Path::new("site-src"))?;
/// assert!(stat.is_directory());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl FsStorage {
    /// Create a new filesystem storage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn error(err: std::io::Error, path: &Path) -> StorageError {
        StorageError::io(err, Some(path)).with_backend(BACKEND)
    }
}

/// Classify filesystem metadata.
fn entry_kind(metadata: &fs::Metadata) -> EntryKind {
    if metadata.is_dir() {
        EntryKind::Directory
    } else if metadata.is_file() {
        if is_executable(metadata) {
            EntryKind::Executable
        } else {
            EntryKind::File
        }
    } else {
        EntryKind::Other
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

impl Storage for FsStorage {
    fn stat(&self, path: &Path) -> Result<Stat, StorageError> {
        let metadata = fs::metadata(path).map_err(|e| Self::error(e, path))?;
        Ok(Stat::new(entry_kind(&metadata)))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let entries = fs::read_dir(path).map_err(|e| Self::error(e, path))?;

        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::error(e, path))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Dangling symlinks have no target metadata.
            let kind = fs::metadata(entry.path()).map_or(EntryKind::Other, |m| entry_kind(&m));
            listing.push(DirEntry::new(name, kind));
        }

        listing.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::trace!(path = %path.display(), entries = listing.len(), "Listed directory");
        Ok(listing)
    }

    fn read(&self, path: &Path) -> Result<String, StorageError> {
        fs::read_to_string(path).map_err(|e| Self::error(e, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageErrorKind;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_fs_storage_is_send_sync() {
        assert_send_sync::<FsStorage>();
    }

    fn create_test_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_stat_directory_and_file() {
        let temp_dir = create_test_dir();
        fs::write(temp_dir.path().join("page.xhtml"), "<p/>").unwrap();

        let storage = FsStorage::new();

        assert!(storage.stat(temp_dir.path()).unwrap().is_directory());
        let stat = storage.stat(&temp_dir.path().join("page.xhtml")).unwrap();
        assert_eq!(stat.kind, EntryKind::File);
    }

    #[cfg(unix)]
    #[test]
    fn test_stat_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = create_test_dir();
        let script = temp_dir.path().join("date.sh");
        fs::write(&script, "#!/bin/sh\ndate\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let storage = FsStorage::new();

        assert!(storage.stat(&script).unwrap().is_executable());
    }

    #[test]
    fn test_stat_missing() {
        let storage = FsStorage::new();
        let err = storage.stat(Path::new("/nonexistent/nancy")).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.backend, Some("Fs"));
    }

    #[test]
    fn test_list_dir_sorted_with_kinds() {
        let temp_dir = create_test_dir();
        fs::write(temp_dir.path().join("b.xml"), "<b/>").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join(".hidden"), "").unwrap();

        let storage = FsStorage::new();
        let listing = storage.list_dir(temp_dir.path()).unwrap();

        assert_eq!(
            listing,
            vec![
                DirEntry::new(".hidden", EntryKind::File),
                DirEntry::new("a.txt", EntryKind::File),
                DirEntry::new("b.xml", EntryKind::File),
                DirEntry::new("sub", EntryKind::Directory),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_list_dir_dangling_link_is_other() {
        let temp_dir = create_test_dir();
        std::os::unix::fs::symlink("/nonexistent/target", temp_dir.path().join("broken-link"))
            .unwrap();

        let storage = FsStorage::new();
        let listing = storage.list_dir(temp_dir.path()).unwrap();

        assert_eq!(listing, vec![DirEntry::new("broken-link", EntryKind::Other)]);
    }

    #[test]
    fn test_list_dir_on_file_fails() {
        let temp_dir = create_test_dir();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();

        let storage = FsStorage::new();

        assert!(storage.list_dir(&file).is_err());
    }

    #[test]
    fn test_read_text() {
        let temp_dir = create_test_dir();
        let file = temp_dir.path().join("a.xhtml");
        fs::write(&file, "<p>Hello</p>").unwrap();

        let storage = FsStorage::new();

        assert_eq!(storage.read(&file).unwrap(), "<p>Hello</p>");
    }

    #[test]
    fn test_read_invalid_utf8() {
        let temp_dir = create_test_dir();
        let file = temp_dir.path().join("blob.bin");
        fs::write(&file, [0xff, 0xfe, 0x00]).unwrap();

        let storage = FsStorage::new();
        let err = storage.read(&file).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidData);
    }
}
