//! JSON-file image catalog.
//!
//! [`JsonCatalog`] is the reference [`ImageRepository`]: every record lives in
//! one pretty-printed JSON document that is rewritten after each mutation.
//! Ids come from per-kind counters that only ever grow, so an id is never
//! handed out twice even after deletes.
//!
//! ```json
//! {
//!   "version": 1,
//!   "next_image_id": 3,
//!   "next_version_id": 5,
//!   "images": [ { "id": 1, "unique_token": "...", "name": "dawn", ... } ],
//!   "versions": [ { "id": 4, "image_id": 1, "version": "thumb", ... } ]
//! }
//! ```
//!
//! A mutation is applied to a copy of the state and only becomes visible once
//! the file has been written, so a failed save leaves the catalog unchanged.

use crate::records::{
    ImageId, ImageRecord, ImageRepository, NewImage, NewVersion, PersistenceError, VersionId,
    VersionRecord,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Version of the catalog format.
const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct CatalogState {
    version: u32,
    next_image_id: ImageId,
    next_version_id: VersionId,
    images: Vec<ImageRecord>,
    versions: Vec<VersionRecord>,
}

impl CatalogState {
    fn empty() -> Self {
        Self {
            version: CATALOG_VERSION,
            next_image_id: 1,
            next_version_id: 1,
            images: Vec::new(),
            versions: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct JsonCatalog {
    path: Option<PathBuf>,
    state: Mutex<CatalogState>,
}

impl JsonCatalog {
    /// A catalog that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(CatalogState::empty()),
        }
    }

    /// Open the catalog at `path`. A missing file is an empty catalog; an
    /// unreadable or foreign one is an error rather than silently empty.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let state = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| storage(path, e))?;
            let state: CatalogState =
                serde_json::from_str(&content).map_err(|e| storage(path, e))?;
            if state.version != CATALOG_VERSION {
                return Err(PersistenceError::Storage(format!(
                    "{}: unsupported catalog version {}",
                    path.display(),
                    state.version
                )));
            }
            state
        } else {
            CatalogState::empty()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogState>, PersistenceError> {
        self.state
            .lock()
            .map_err(|_| PersistenceError::Storage("catalog lock poisoned".into()))
    }

    fn save(&self, state: &CatalogState) -> Result<(), PersistenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(state).map_err(|e| storage(path, e))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| storage(path, e))?;
        }
        fs::write(path, json).map_err(|e| storage(path, e))?;
        debug!(
            "saved catalog {} ({} images, {} versions)",
            path.display(),
            state.images.len(),
            state.versions.len()
        );
        Ok(())
    }

    /// Apply `change` to a copy of the state, persist it, then publish it.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut CatalogState) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let result = change(&mut next)?;
        self.save(&next)?;
        *guard = next;
        Ok(result)
    }
}

fn storage(path: &Path, e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Storage(format!("{}: {e}", path.display()))
}

impl ImageRepository for JsonCatalog {
    fn insert_image(&self, image: NewImage) -> Result<ImageRecord, PersistenceError> {
        let errors = image.validate();
        if !errors.is_empty() {
            return Err(PersistenceError::Rejected(errors));
        }
        self.mutate(|state| {
            let record = image.into_record(state.next_image_id);
            state.next_image_id += 1;
            state.images.push(record.clone());
            Ok(record)
        })
    }

    fn update_image(&self, image: &ImageRecord) -> Result<(), PersistenceError> {
        let errors = image.validate();
        if !errors.is_empty() {
            return Err(PersistenceError::Rejected(errors));
        }
        self.mutate(|state| {
            let slot = state
                .images
                .iter_mut()
                .find(|i| i.id == image.id)
                .ok_or(PersistenceError::ImageNotFound(image.id))?;
            *slot = image.clone();
            Ok(())
        })
    }

    fn delete_image(&self, id: ImageId) -> Result<(), PersistenceError> {
        self.mutate(|state| {
            let before = state.images.len();
            state.images.retain(|i| i.id != id);
            if state.images.len() == before {
                return Err(PersistenceError::ImageNotFound(id));
            }
            state.versions.retain(|v| v.image_id != id);
            Ok(())
        })
    }

    fn find_image(&self, id: ImageId) -> Result<Option<ImageRecord>, PersistenceError> {
        Ok(self.lock()?.images.iter().find(|i| i.id == id).cloned())
    }

    fn list_images(&self) -> Result<Vec<ImageRecord>, PersistenceError> {
        Ok(self.lock()?.images.clone())
    }

    fn insert_version(&self, version: NewVersion) -> Result<VersionRecord, PersistenceError> {
        let errors = version.validate();
        if !errors.is_empty() {
            return Err(PersistenceError::Rejected(errors));
        }
        self.mutate(|state| {
            if !state.images.iter().any(|i| i.id == version.image_id) {
                return Err(PersistenceError::ImageNotFound(version.image_id));
            }
            if state
                .versions
                .iter()
                .any(|v| v.image_id == version.image_id && v.version == version.version)
            {
                return Err(PersistenceError::rejected(
                    "version",
                    format!("`{}` has already been taken", version.version),
                ));
            }
            let record = version.into_record(state.next_version_id);
            state.next_version_id += 1;
            state.versions.push(record.clone());
            Ok(record)
        })
    }

    fn delete_version(&self, id: VersionId) -> Result<(), PersistenceError> {
        self.mutate(|state| {
            let before = state.versions.len();
            state.versions.retain(|v| v.id != id);
            if state.versions.len() == before {
                return Err(PersistenceError::VersionNotFound(id));
            }
            Ok(())
        })
    }

    fn versions_of(&self, image_id: ImageId) -> Result<Vec<VersionRecord>, PersistenceError> {
        Ok(self
            .lock()?
            .versions
            .iter()
            .filter(|v| v.image_id == image_id)
            .cloned()
            .collect())
    }
}
