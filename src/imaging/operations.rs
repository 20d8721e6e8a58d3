//! High-level image operations.
//!
//! These combine the pure resize engine with backend encoding. They know
//! nothing about files or records; the [`versions`](crate::versions) module
//! decides where the bytes go.

use super::backend::{BackendError, ImageBackend};
use super::dimensions::{DimensionSpec, SpecError};
use super::params::Quality;
use super::resize::{self, ResizeError, SourceImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Resize(#[from] ResizeError),
    #[error(transparent)]
    Encode(#[from] BackendError),
}

/// An encoded version ready to be written.
#[derive(Debug, Clone)]
pub struct RenderedVersion {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl RenderedVersion {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Validate `spec`, derive the version and encode it for `extension`.
pub fn render_version(
    backend: &impl ImageBackend,
    source: &SourceImage,
    spec: &DimensionSpec,
    extension: &str,
) -> Result<RenderedVersion, RenderError> {
    spec.validate()?;
    let quality = Quality::new(spec.quality)?;
    let derived = resize::generate(source, spec)?;
    let bytes = backend.encode(derived.image(), extension, quality)?;
    Ok(RenderedVersion {
        width: derived.width(),
        height: derived.height(),
        bytes,
    })
}
