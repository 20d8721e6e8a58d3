//! Version lifecycle: create, generate, look up, delete.
//!
//! [`VersionOrchestrator`] ties the pure imaging layer to the two
//! collaborators supplied by the application, an [`ImageRepository`] for
//! records and a [`FileStore`] for bytes. Every workflow runs synchronously
//! on the caller's thread, strictly in spec order.
//!
//! ## Creating an image
//!
//! ```text
//! decode → autorotate → insert ImageRecord → write original → versions
//!                              │                   │              │
//!                          rejected:           failed: drop   failed: drop
//!                          nothing written     the record     image + files
//! ```
//!
//! ## Generating versions
//!
//! Each spec is rendered, its record inserted, then its file written. A
//! rejected record therefore never leaves a file behind. The batch is
//! all-or-nothing: the first failure removes every version created by the
//! same call and comes back as a [`VersionFailure`] naming the version.
//!
//! Cleanup steps that fail during a rollback are logged and never replace
//! the error that triggered the rollback.

use crate::config::StoreConfig;
use crate::imaging::{
    BackendError, DimensionSpec, ImageBackend, Quality, RenderError, SourceImage, SpecError,
    guess_format, render_version,
};
use crate::naming::{StorageNamer, generate_token, split_file_name};
use crate::records::{
    ImageId, ImageRecord, ImageRepository, NewImage, NewVersion, PersistenceError, VersionRecord,
};
use crate::store::{FileStore, FileStoreError};
use image::metadata::Orientation;
use log::{debug, info, warn};
use std::borrow::Cow;
use std::fmt::Display;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Why a single version could not be created.
#[derive(Error, Debug)]
pub enum VersionCause {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Files(#[from] FileStoreError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// A failed batch, tagged with the version that broke it.
#[derive(Error, Debug)]
#[error("version `{version}` failed: {cause}")]
pub struct VersionFailure {
    pub version: String,
    #[source]
    pub cause: VersionCause,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("unknown image group `{0}`")]
    UnknownGroup(String),
    #[error("failed to decode source image: {0}")]
    Decode(#[source] BackendError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Files(#[from] FileStoreError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Version(#[from] VersionFailure),
}

/// An uploaded file, before it becomes an image.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Client-side file name, e.g. `dawn.jpg`.
    pub name: String,
    pub bytes: Vec<u8>,
    /// MIME type reported by the client; sniffed from the bytes if absent.
    pub mime_type: Option<String>,
    /// Unix seconds.
    pub uploaded_at: i64,
}

impl SourceFile {
    /// An upload stamped with the current time.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: None,
            uploaded_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Read a local file as an upload named after its last path component.
    pub fn read(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }
}

/// Which versions of an image to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelection {
    All,
    Named(Vec<String>),
}

impl VersionSelection {
    fn includes(&self, version: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(names) => names.iter().any(|n| n == version),
        }
    }
}

/// Log a failed cleanup step without interrupting the caller.
fn cleanup<T, E: Display>(what: impl Display, result: Result<T, E>) {
    if let Err(e) = result {
        warn!("cleanup failed: {what}: {e}");
    }
}

/// Runs image and version workflows against the configured collaborators.
pub struct VersionOrchestrator<'a, B, F, R> {
    config: &'a StoreConfig,
    namer: StorageNamer,
    backend: &'a B,
    files: &'a F,
    records: &'a R,
}

impl<'a, B, F, R> VersionOrchestrator<'a, B, F, R>
where
    B: ImageBackend,
    F: FileStore,
    R: ImageRepository,
{
    pub fn new(config: &'a StoreConfig, backend: &'a B, files: &'a F, records: &'a R) -> Self {
        Self {
            config,
            namer: StorageNamer::from_config(config),
            backend,
            files,
            records,
        }
    }

    pub fn config(&self) -> &'a StoreConfig {
        self.config
    }

    pub fn namer(&self) -> &StorageNamer {
        &self.namer
    }

    pub(crate) fn backend(&self) -> &'a B {
        self.backend
    }

    pub fn files(&self) -> &'a F {
        self.files
    }

    pub fn records(&self) -> &'a R {
        self.records
    }

    /// Version specs for the image's group. No group means no versions.
    pub(crate) fn group_specs(
        &self,
        group: Option<&str>,
    ) -> Result<&'a [DimensionSpec], WorkflowError> {
        match group {
            None => Ok(&[]),
            Some(name) => self
                .config
                .versions_for(name)
                .ok_or_else(|| WorkflowError::UnknownGroup(name.to_string())),
        }
    }

    pub(crate) fn original_quality(&self) -> Result<Quality, WorkflowError> {
        Ok(Quality::new(self.config.original_quality)?)
    }

    /// Decode the stored original of `image`.
    pub fn load_original(&self, image: &ImageRecord) -> Result<SourceImage, WorkflowError> {
        let bytes = self.files.read(&self.namer.original_path(image))?;
        self.backend.open(&bytes).map_err(WorkflowError::Decode)
    }

    pub fn find_image(&self, id: ImageId) -> Result<ImageRecord, WorkflowError> {
        self.records
            .find_image(id)?
            .ok_or(WorkflowError::Persistence(PersistenceError::ImageNotFound(id)))
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Store an upload as a new image and generate its group's versions.
    ///
    /// On failure nothing of the image remains: no record, no files.
    pub fn create_from_source(
        &self,
        group: Option<&str>,
        upload: &SourceFile,
        is_temp: bool,
    ) -> Result<ImageRecord, WorkflowError> {
        let specs = self.group_specs(group)?;
        let (name, mut extension) = split_file_name(&upload.name);
        let format = guess_format(&upload.bytes);
        if extension.is_empty()
            && let Some(ext) = format.and_then(|f| f.extensions_str().first())
        {
            extension = (*ext).to_string();
        }

        let decoded = self
            .backend
            .open(&upload.bytes)
            .map_err(WorkflowError::Decode)?;
        let needs_rotation = decoded.orientation() != Orientation::NoTransforms;
        let source = self.backend.autorotate(decoded);
        let original: Cow<'_, [u8]> = if needs_rotation {
            let quality = self.original_quality()?;
            Cow::Owned(self.backend.encode(source.image(), &extension, quality)?)
        } else {
            Cow::Borrowed(upload.bytes.as_slice())
        };
        debug!(
            "decoded {} ({}x{}, autorotated: {needs_rotation})",
            upload.name,
            source.width(),
            source.height()
        );

        let mime_type = upload
            .mime_type
            .clone()
            .or_else(|| format.map(|f| f.to_mime_type().to_string()));
        let record = self.records.insert_image(NewImage {
            group: group.map(str::to_string),
            unique_token: generate_token(),
            name,
            extension,
            is_temp,
            uploaded_at: upload.uploaded_at,
            mime_type,
            width: Some(source.width()),
            height: Some(source.height()),
            size: Some(original.len() as u64),
        })?;
        debug!("image {} record persisted", record.id);

        let original_path = self.namer.original_path(&record);
        if let Err(e) = self.files.write(&original_path, &original) {
            warn!("writing original of image {} failed: {e}", record.id);
            cleanup(
                original_path.display(),
                self.files.delete(&original_path),
            );
            cleanup(
                format!("image record {}", record.id),
                self.records.delete_image(record.id),
            );
            return Err(e.into());
        }
        debug!("image {} original written", record.id);

        if let Err(e) = self.generate_versions(&record, specs, Some(&source)) {
            warn!("versions of image {} failed, removing image: {e}", record.id);
            cleanup(
                original_path.display(),
                self.files.delete(&original_path),
            );
            cleanup(
                format!("image record {}", record.id),
                self.records.delete_image(record.id),
            );
            return Err(e);
        }

        info!(
            "created image {} from {} with {} version(s)",
            record.id,
            upload.name,
            specs.len()
        );
        Ok(record)
    }

    // =========================================================================
    // Generate
    // =========================================================================

    /// Generate one version per spec, in order. Without `source` the stored
    /// original is decoded.
    pub fn generate_versions(
        &self,
        image: &ImageRecord,
        specs: &[DimensionSpec],
        source: Option<&SourceImage>,
    ) -> Result<Vec<VersionRecord>, WorkflowError> {
        let loaded;
        let source = match source {
            Some(source) => source,
            None => {
                loaded = self.load_original(image)?;
                &loaded
            }
        };

        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.create_version(image, source, spec) {
                Ok(record) => created.push(record),
                Err(cause) => {
                    warn!(
                        "version `{}` of image {} failed: {cause}; rolling back {} version(s)",
                        spec.version,
                        image.id,
                        created.len()
                    );
                    for record in &created {
                        cleanup(
                            format!("version `{}` of image {}", record.version, image.id),
                            self.remove_version(image, record),
                        );
                    }
                    return Err(VersionFailure {
                        version: spec.version.clone(),
                        cause,
                    }
                    .into());
                }
            }
        }

        if !created.is_empty() {
            info!("generated {} version(s) for image {}", created.len(), image.id);
        }
        Ok(created)
    }

    fn create_version(
        &self,
        image: &ImageRecord,
        source: &SourceImage,
        spec: &DimensionSpec,
    ) -> Result<VersionRecord, VersionCause> {
        let rendered = render_version(self.backend, source, spec, &image.extension)?;
        let record = self.records.insert_version(NewVersion {
            image_id: image.id,
            version: spec.version.clone(),
            width: rendered.width,
            height: rendered.height,
            size: rendered.size(),
        })?;

        let path = self.namer.version_path(image, &spec.version);
        if let Err(e) = self.files.write(&path, &rendered.bytes) {
            cleanup(path.display(), self.files.delete(&path));
            cleanup(
                format!("version record {}", record.id),
                self.records.delete_version(record.id),
            );
            return Err(e.into());
        }
        debug!(
            "version `{}` of image {}: {}x{}, {} bytes",
            spec.version,
            image.id,
            rendered.width,
            rendered.height,
            rendered.size()
        );
        Ok(record)
    }

    // =========================================================================
    // Lookup and delete
    // =========================================================================

    pub fn versions(&self, image: &ImageRecord) -> Result<Vec<VersionRecord>, WorkflowError> {
        Ok(self.records.versions_of(image.id)?)
    }

    /// The version of `image` called `name`, if any.
    pub fn version(
        &self,
        image: &ImageRecord,
        name: &str,
    ) -> Result<Option<VersionRecord>, WorkflowError> {
        Ok(self
            .records
            .versions_of(image.id)?
            .into_iter()
            .find(|v| v.version == name))
    }

    /// Delete file then record, so a record never outlives a failed delete
    /// without its file. A file that is already gone is fine.
    fn remove_version(
        &self,
        image: &ImageRecord,
        version: &VersionRecord,
    ) -> Result<(), WorkflowError> {
        self.files
            .delete(&self.namer.version_path(image, &version.version))?;
        self.records.delete_version(version.id)?;
        Ok(())
    }

    /// Delete the selected versions, returning how many were removed.
    pub fn delete_versions(
        &self,
        image: &ImageRecord,
        selection: &VersionSelection,
    ) -> Result<usize, WorkflowError> {
        let mut removed = 0;
        for version in self.records.versions_of(image.id)? {
            if selection.includes(&version.version) {
                self.remove_version(image, &version)?;
                removed += 1;
            }
        }
        debug!("deleted {removed} version(s) of image {}", image.id);
        Ok(removed)
    }

    /// Delete every version, the original file and the record.
    pub fn delete_image(&self, image: &ImageRecord) -> Result<(), WorkflowError> {
        self.delete_versions(image, &VersionSelection::All)?;
        self.files.delete(&self.namer.original_path(image))?;
        self.records.delete_image(image.id)?;
        info!("deleted image {}", image.id);
        Ok(())
    }

    /// Drop all versions and regenerate the group's set from the original.
    pub fn regenerate_versions(
        &self,
        image: &ImageRecord,
    ) -> Result<Vec<VersionRecord>, WorkflowError> {
        let specs = self.group_specs(image.group.as_deref())?;
        let source = self.load_original(image)?;
        self.delete_versions(image, &VersionSelection::All)?;
        self.generate_versions(image, specs, Some(&source))
    }
}
