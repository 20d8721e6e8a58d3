//! # Image Versions
//!
//! Stores uploaded images and derives named versions ("thumb", "large", ...)
//! from each one, keeping files and metadata records consistent through
//! every create, rotate and delete.
//!
//! # Architecture
//!
//! ```text
//! upload ─► ImageBackend ─► resize engine ─► ImageBackend ─► FileStore
//!           (decode,         (pure geometry    (encode)        (bytes)
//!            autorotate)      + pixels)                  ╲
//!                                                         ► ImageRepository
//!                                                           (records)
//! ```
//!
//! The core owns the geometry and the workflows. Persistence and storage are
//! traits the application implements; [`catalog::JsonCatalog`] and
//! [`store::LocalFileStore`] are the reference adapters the CLI uses.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Version specs, resize geometry and engine, codec backend |
//! | [`versions`] | [`VersionOrchestrator`](versions::VersionOrchestrator): create, generate, delete, regenerate |
//! | [`rotation`] | Rotate or resize an original in place, then rebuild versions |
//! | [`naming`] | `{id}_{token}[_{version}].{ext}` file names, paths and URLs |
//! | [`records`] | Image and version records, the [`ImageRepository`](records::ImageRepository) trait |
//! | [`store`] | The [`FileStore`](store::FileStore) trait and its filesystem implementation |
//! | [`catalog`] | JSON-file repository |
//! | [`attach`] | Attach an upload to an owning record, replacing the old image |
//! | [`maintenance`] | Legacy name migration, orphan sweep, temp purge |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## All-or-Nothing Batches
//!
//! A version batch either commits every version or none. Versions are
//! produced strictly in configured order on the caller's thread, so the
//! version that broke a batch is always the one named in the returned
//! [`VersionFailure`](versions::VersionFailure), and rollback only has to
//! undo what the same call created.
//!
//! ## Record Before File
//!
//! Ids come from the repository, so a record is always inserted before its
//! file is written. A rejected record never leaves a file behind; a failed
//! write removes the record it was written for.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling (Lanczos3) and encoding use the `image` crate and
//! its pure-Rust codecs. There are no system libraries to install.

pub mod attach;
pub mod catalog;
pub mod config;
pub mod imaging;
pub mod maintenance;
pub mod naming;
pub mod output;
pub mod records;
pub mod rotation;
pub mod store;
pub mod versions;

#[cfg(test)]
pub(crate) mod test_helpers;
