//! I/O boundary traits for testability
//!
//! These traits abstract the hierarchical store and the filesystem beneath
//! it, allowing the loader to be tested against in-memory implementations.

use std::io;
use std::path::Path;

use crate::domain::Leaf;
use crate::infrastructure::error::StoreResult;

/// Kind of a store child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Dataset,
    Group,
}

/// Named child of a store group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub kind: ChildKind,
}

impl ChildEntry {
    pub fn dataset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Dataset,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChildKind::Group,
        }
    }
}

/// Read access to a tree of named groups and typed datasets.
///
/// Paths are slash-separated; `/` is the root group. Group paths may carry a
/// trailing slash.
pub trait HierarchicalStore: Send + Sync {
    /// Names and kinds of the children of the group at `path`.
    fn list_children(&self, path: &str) -> StoreResult<Vec<ChildEntry>>;

    /// Raw value of the dataset at `path`; its element type is `Leaf::dtype`.
    fn read_dataset(&self, path: &str) -> StoreResult<Leaf>;

    /// Boolean attribute `name` of the group at `path`, `None` when unset.
    fn read_group_attribute(&self, path: &str, name: &str) -> StoreResult<Option<bool>>;

    /// Release the store. Reads after closing fail with `StoreError::Closed`.
    fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Directory entry as seen by [`FileSystem::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Immediate entries of a directory, sorted by file name.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        use walkdir::WalkDir;

        let mut entries = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }
}
