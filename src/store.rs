//! File storage seam.
//!
//! The orchestrator reads and writes originals and versions through
//! [`FileStore`]; [`LocalFileStore`] is the plain filesystem implementation.
//! Deleting a file that is already gone is not an error: `delete` reports
//! whether anything was removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait FileStore: Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FileStoreError>;

    /// Write the whole file, replacing any previous content.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), FileStoreError>;

    /// Returns `false` when there was nothing to delete.
    fn delete(&self, path: &Path) -> Result<bool, FileStoreError>;

    fn exists(&self, path: &Path) -> bool;

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileStoreError>;

    /// Files directly inside `dir`, sorted. A missing directory is empty.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, FileStoreError>;
}

/// [`FileStore`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl FileStore for LocalFileStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FileStoreError> {
        fs::read(path).map_err(|source| FileStoreError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), FileStoreError> {
        ensure_parent(path)
            .and_then(|()| fs::write(path, bytes))
            .map_err(|source| FileStoreError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    fn delete(&self, path: &Path) -> Result<bool, FileStoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FileStoreError::Delete {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileStoreError> {
        ensure_parent(to)
            .and_then(|()| fs::rename(from, to))
            .map_err(|source| FileStoreError::Rename {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, FileStoreError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| FileStoreError::List {
                path: dir.to_path_buf(),
                source: io::Error::from(e),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
