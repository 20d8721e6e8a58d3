//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode + orientation** | `image::ImageReader`, `ImageDecoder::orientation` |
//! | **Scale / crop / pad** | Lanczos3 `resize_exact`, `crop_imm`, `imageops::replace` |
//! | **Encode** | JPEG / AVIF encoders at a quality, PNG / TIFF / WebP lossless |
//!
//! The module is split into:
//! - **Dimensions**: [`DimensionSpec`], the declarative version description
//! - **Calculations**: pure geometry (target resolution, scale, crop, padding)
//! - **Resize**: the engine that executes a plan against pixels
//! - **Parameters**: [`Quality`] and [`Rotation`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: render one version (validate, resize, encode)

pub mod backend;
pub mod calculations;
pub mod dimensions;
pub mod operations;
mod params;
pub mod resize;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use dimensions::{BackgroundColor, DimensionSpec, SpecError};
pub use operations::{RenderError, RenderedVersion, render_version};
pub use params::{Quality, Rotation};
pub use resize::{DerivedImage, ResizeError, SourceImage, generate};
pub use rust_backend::{RustBackend, guess_format};
