//! Attaching an uploaded image to an owning record.
//!
//! Applications that keep an image id on their own records (a user's avatar,
//! an article's cover) call [`ImageAttachment::attach`] after saving the
//! owner, then store the returned id themselves.

use crate::imaging::ImageBackend;
use crate::records::{ImageId, ImageRepository};
use crate::store::FileStore;
use crate::versions::{SourceFile, VersionOrchestrator, WorkflowError};
use log::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Group whose versions are generated for the new image.
    pub group: Option<String>,
    /// Remove the previously attached image once the new one exists.
    pub delete_old: bool,
}

impl ImageAttachment {
    pub fn new(group: Option<&str>) -> Self {
        Self {
            group: group.map(str::to_string),
            delete_old: true,
        }
    }

    pub fn keep_old(mut self) -> Self {
        self.delete_old = false;
        self
    }

    /// Create an image from `upload` and return its id.
    ///
    /// The previous image `current` is deleted only after the new one was
    /// created, and only if it still exists. On failure it is untouched.
    pub fn attach<B, F, R>(
        &self,
        orchestrator: &VersionOrchestrator<'_, B, F, R>,
        current: Option<ImageId>,
        upload: &SourceFile,
    ) -> Result<ImageId, WorkflowError>
    where
        B: ImageBackend,
        F: FileStore,
        R: ImageRepository,
    {
        let image = orchestrator.create_from_source(self.group.as_deref(), upload, false)?;
        if self.delete_old
            && let Some(old_id) = current
            && old_id != image.id
            && let Some(old) = orchestrator.records().find_image(old_id)?
        {
            orchestrator.delete_image(&old)?;
            info!("replaced image {old_id} with {}", image.id);
        }
        Ok(image.id)
    }
}
