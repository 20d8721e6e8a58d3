//! Image codec backend trait and its error type.
//!
//! The [`ImageBackend`] trait is the decode/encode seam: everything that
//! touches a container format (or its orientation metadata) goes through it,
//! while pixel geometry stays in the pure [`resize`](super::resize) engine.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure-Rust codecs.

use super::params::{Quality, Rotation};
use super::resize::SourceImage;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode {format}: {message}")]
    Encode { format: String, message: String },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Trait for image codec backends.
///
/// The orchestration code is generic over this trait so tests can swap in a
/// recording or failing backend without touching workflow logic.
pub trait ImageBackend: Sync {
    /// Decode an image and read its embedded orientation.
    fn open(&self, bytes: &[u8]) -> Result<SourceImage, BackendError>;

    /// Apply the embedded orientation to the pixels.
    fn autorotate(&self, image: SourceImage) -> SourceImage;

    /// Rotate clockwise.
    fn rotate(&self, image: &SourceImage, rotation: Rotation) -> SourceImage;

    /// Encode for a file with the given extension.
    fn encode(
        &self,
        image: &DynamicImage,
        extension: &str,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
