//! Shared test utilities for the image-versions test suite.
//!
//! Provides synthetic images, record fixtures, and in-memory collaborators
//! with fault injection so workflow tests can fail any step on demand.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let files = MemoryFileStore::new();
//! files.fail_writes_matching("_large.");
//! let records = MemoryRepository::new();
//! records.reject_version("thumb");
//! ```

use crate::catalog::JsonCatalog;
use crate::config::StoreConfig;
use crate::imaging::DimensionSpec;
use crate::imaging::backend::tests::MockBackend;
use crate::records::{
    ImageId, ImageRecord, ImageRepository, NewImage, NewVersion, PersistenceError, VersionId,
    VersionRecord,
};
use crate::store::{FileStore, FileStoreError};
use crate::versions::{SourceFile, VersionOrchestrator};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A valid 32-character token used by fixtures.
pub const TOKEN: &str = "0123456789abcdefghijABCDEFGHIJkl";

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB gradient, so resized output is not uniform.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

// =========================================================================
// Record fixtures
// =========================================================================

pub fn new_image(name: &str, extension: &str) -> NewImage {
    NewImage {
        group: None,
        unique_token: TOKEN.to_string(),
        name: name.to_string(),
        extension: extension.to_string(),
        is_temp: false,
        uploaded_at: 1_700_000_000,
        mime_type: None,
        width: None,
        height: None,
        size: None,
    }
}

/// An already-persisted image named `photo`.
pub fn stored_image(id: ImageId, extension: &str) -> ImageRecord {
    new_image("photo", extension).into_record(id)
}

pub fn new_version(image_id: ImageId, version: &str) -> NewVersion {
    NewVersion {
        image_id,
        version: version.to_string(),
        width: 10,
        height: 10,
        size: 100,
    }
}

// =========================================================================
// In-memory file store
// =========================================================================

/// [`FileStore`] over a map, with write and delete failure injection.
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    fail_writes: Mutex<Vec<String>>,
    tear_writes: Mutex<Vec<String>>,
    fail_deletes: Mutex<Vec<String>>,
}

fn injected() -> io::Error {
    io::Error::other("injected failure")
}

fn matches_any(path: &Path, patterns: &Mutex<Vec<String>>) -> bool {
    let path = path.to_string_lossy();
    patterns
        .lock()
        .unwrap()
        .iter()
        .any(|p| path.contains(p.as_str()))
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without going through failure injection.
    pub fn put(&self, path: &Path, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), bytes.to_vec());
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// File names (last path component) currently stored.
    pub fn names(&self) -> Vec<String> {
        self.paths()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    /// Fail every write whose path contains `pattern`.
    pub fn fail_writes_matching(&self, pattern: &str) {
        self.fail_writes.lock().unwrap().push(pattern.to_string());
    }

    /// Store the first half of every write whose path contains `pattern`,
    /// then fail it, like a disk filling up mid-write.
    pub fn tear_writes_matching(&self, pattern: &str) {
        self.tear_writes.lock().unwrap().push(pattern.to_string());
    }

    /// Fail every delete whose path contains `pattern`.
    pub fn fail_deletes_matching(&self, pattern: &str) {
        self.fail_deletes.lock().unwrap().push(pattern.to_string());
    }
}

impl FileStore for MemoryFileStore {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FileStoreError> {
        self.get(path).ok_or_else(|| FileStoreError::Read {
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), FileStoreError> {
        if matches_any(path, &self.fail_writes) {
            return Err(FileStoreError::Write {
                path: path.to_path_buf(),
                source: injected(),
            });
        }
        if matches_any(path, &self.tear_writes) {
            self.put(path, &bytes[..bytes.len() / 2]);
            return Err(FileStoreError::Write {
                path: path.to_path_buf(),
                source: injected(),
            });
        }
        self.put(path, bytes);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<bool, FileStoreError> {
        if matches_any(path, &self.fail_deletes) {
            return Err(FileStoreError::Delete {
                path: path.to_path_buf(),
                source: injected(),
            });
        }
        Ok(self.files.lock().unwrap().remove(path).is_some())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FileStoreError> {
        let mut files = self.files.lock().unwrap();
        let bytes = files.remove(from).ok_or_else(|| FileStoreError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })?;
        files.insert(to.to_path_buf(), bytes);
        Ok(())
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, FileStoreError> {
        Ok(self
            .paths()
            .into_iter()
            .filter(|p| p.parent() == Some(dir))
            .collect())
    }
}

// =========================================================================
// In-memory repository
// =========================================================================

/// [`ImageRepository`] over an in-memory [`JsonCatalog`], with rejection
/// injection for image inserts and updates, and for named versions.
#[derive(Debug)]
pub struct MemoryRepository {
    catalog: JsonCatalog,
    reject_images: Mutex<bool>,
    rejected_versions: Mutex<Vec<String>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self {
            catalog: JsonCatalog::in_memory(),
            reject_images: Mutex::new(false),
            rejected_versions: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_images(&self) {
        *self.reject_images.lock().unwrap() = true;
    }

    pub fn reject_version(&self, version: &str) {
        self.rejected_versions
            .lock()
            .unwrap()
            .push(version.to_string());
    }

    pub fn image_count(&self) -> usize {
        self.catalog.list_images().unwrap().len()
    }

    /// Version names of one image, in insertion order.
    pub fn version_names(&self, image_id: ImageId) -> Vec<String> {
        self.catalog
            .versions_of(image_id)
            .unwrap()
            .into_iter()
            .map(|v| v.version)
            .collect()
    }

    pub fn image(&self, id: ImageId) -> ImageRecord {
        self.catalog
            .find_image(id)
            .unwrap()
            .unwrap_or_else(|| panic!("image {id} not found"))
    }
}

impl ImageRepository for MemoryRepository {
    fn insert_image(&self, image: NewImage) -> Result<ImageRecord, PersistenceError> {
        if *self.reject_images.lock().unwrap() {
            return Err(PersistenceError::rejected("name", "injected rejection"));
        }
        self.catalog.insert_image(image)
    }

    fn update_image(&self, image: &ImageRecord) -> Result<(), PersistenceError> {
        if *self.reject_images.lock().unwrap() {
            return Err(PersistenceError::rejected("name", "injected rejection"));
        }
        self.catalog.update_image(image)
    }

    fn delete_image(&self, id: ImageId) -> Result<(), PersistenceError> {
        self.catalog.delete_image(id)
    }

    fn find_image(&self, id: ImageId) -> Result<Option<ImageRecord>, PersistenceError> {
        self.catalog.find_image(id)
    }

    fn list_images(&self) -> Result<Vec<ImageRecord>, PersistenceError> {
        self.catalog.list_images()
    }

    fn insert_version(&self, version: NewVersion) -> Result<VersionRecord, PersistenceError> {
        if self
            .rejected_versions
            .lock()
            .unwrap()
            .contains(&version.version)
        {
            return Err(PersistenceError::rejected("version", "injected rejection"));
        }
        self.catalog.insert_version(version)
    }

    fn delete_version(&self, id: VersionId) -> Result<(), PersistenceError> {
        self.catalog.delete_version(id)
    }

    fn versions_of(&self, image_id: ImageId) -> Result<Vec<VersionRecord>, PersistenceError> {
        self.catalog.versions_of(image_id)
    }
}

// =========================================================================
// Workflow harness
// =========================================================================

/// Collaborators for workflow tests. The `gallery` group has a cropped
/// 50x50 `thumb` and an 80-wide resized `large`.
pub struct Harness {
    pub config: StoreConfig,
    pub backend: MockBackend,
    pub files: MemoryFileStore,
    pub records: MemoryRepository,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let mut config = StoreConfig {
            images_root: "/store".into(),
            ..StoreConfig::default()
        };
        config.groups.insert(
            "gallery".into(),
            vec![
                DimensionSpec::new("thumb", Some(50), Some(50)),
                DimensionSpec::new("large", Some(80), None).as_resized(None),
            ],
        );
        Self {
            config,
            backend,
            files: MemoryFileStore::new(),
            records: MemoryRepository::new(),
        }
    }

    pub fn orchestrator(
        &self,
    ) -> VersionOrchestrator<'_, MockBackend, MemoryFileStore, MemoryRepository> {
        VersionOrchestrator::new(&self.config, &self.backend, &self.files, &self.records)
    }
}

/// An upload with a fixed timestamp.
pub fn upload(name: &str, bytes: Vec<u8>) -> SourceFile {
    SourceFile {
        name: name.to_string(),
        bytes,
        mime_type: None,
        uploaded_at: 1_700_000_000,
    }
}
