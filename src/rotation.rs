//! Rewriting an image's original in place.
//!
//! Both operations here overwrite the stored original irreversibly and
//! update the record's width, height and size to match the new file.
//! Callers that need to undo a rotation must keep their own copy.

use crate::imaging::{DimensionSpec, ImageBackend, Rotation, SourceImage, render_version};
use crate::records::{ImageRecord, ImageRepository, VersionRecord};
use crate::store::FileStore;
use crate::versions::{VersionOrchestrator, VersionSelection, WorkflowError};
use log::info;

impl<B, F, R> VersionOrchestrator<'_, B, F, R>
where
    B: ImageBackend,
    F: FileStore,
    R: ImageRepository,
{
    /// Rotate clockwise by `degrees` and regenerate every version from the
    /// rotated original.
    ///
    /// Negative angles turn counter-clockwise. Right angles swap or keep the
    /// axes exactly; any other angle draws the turned image on a canvas
    /// large enough to hold it, with white (or transparent) corners.
    /// The group and the original are checked before anything is deleted.
    pub fn rotate(
        &self,
        image: &mut ImageRecord,
        degrees: i32,
    ) -> Result<Vec<VersionRecord>, WorkflowError> {
        let rotation = Rotation::from_degrees(degrees);
        let specs = self.group_specs(image.group.as_deref())?;
        let source = self.load_original(image)?;

        self.delete_versions(image, &VersionSelection::All)?;
        let source = if rotation == Rotation::None {
            source
        } else {
            let rotated = self.backend().rotate(&source, rotation);
            self.overwrite_original(image, &rotated)?;
            rotated
        };
        info!("rotated image {} by {degrees} degrees", image.id);

        self.generate_versions(image, specs, Some(&source))
    }

    /// Resize the stored original itself with `spec`.
    ///
    /// Existing versions are left as they are; call
    /// [`regenerate_versions`](Self::regenerate_versions) to rebuild them.
    pub fn regenerate_original(
        &self,
        image: &mut ImageRecord,
        spec: &DimensionSpec,
    ) -> Result<(), WorkflowError> {
        let source = self.load_original(image)?;
        let rendered = render_version(self.backend(), &source, spec, &image.extension)?;
        self.files()
            .write(&self.namer().original_path(image), &rendered.bytes)?;
        let mut updated = image.clone();
        updated.width = Some(rendered.width);
        updated.height = Some(rendered.height);
        updated.size = Some(rendered.size());
        self.records().update_image(&updated)?;
        *image = updated;
        info!(
            "resized original of image {} to {}x{}",
            image.id, rendered.width, rendered.height
        );
        Ok(())
    }

    fn overwrite_original(
        &self,
        image: &mut ImageRecord,
        pixels: &SourceImage,
    ) -> Result<(), WorkflowError> {
        let quality = self.original_quality()?;
        let bytes = self
            .backend()
            .encode(pixels.image(), &image.extension, quality)?;
        self.files()
            .write(&self.namer().original_path(image), &bytes)?;
        let mut updated = image.clone();
        updated.width = Some(pixels.width());
        updated.height = Some(pixels.height());
        updated.size = Some(bytes.len() as u64);
        self.records().update_image(&updated)?;
        *image = updated;
        Ok(())
    }
}
