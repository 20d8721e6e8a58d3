//! Persisted metadata for images and their versions.
//!
//! The core never stores records itself; it talks to an [`ImageRepository`]
//! supplied by the surrounding application. Repositories allocate ids and
//! validate records on save, reporting problems per field.
//!
//! ```text
//! ImageRecord 12  (original: 12_<token>.jpg)
//! ├── VersionRecord 40 "thumb"  (12_<token>_thumb.jpg)
//! └── VersionRecord 41 "large"  (12_<token>_large.jpg)
//! ```

use crate::imaging::dimensions::MAX_VERSION_NAME_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type ImageId = u64;
pub type VersionId = u64;

/// Longest base name an image record may carry.
pub const MAX_NAME_LEN: usize = 255;
/// Longest extension an image record may carry.
pub const MAX_EXTENSION_LEN: usize = 10;

/// One rejected field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("record rejected: {}", join_fields(.0))]
    Rejected(Vec<FieldError>),
    #[error("image {0} not found")]
    ImageNotFound(ImageId),
    #[error("version {0} not found")]
    VersionNotFound(VersionId),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl PersistenceError {
    /// Reject with a single field error.
    pub fn rejected(field: &str, message: impl Into<String>) -> Self {
        Self::Rejected(vec![FieldError::new(field, message)])
    }
}

/// An image that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub group: Option<String>,
    pub unique_token: String,
    pub name: String,
    pub extension: String,
    pub is_temp: bool,
    pub uploaded_at: i64,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: Option<u64>,
}

impl NewImage {
    pub fn validate(&self) -> Vec<FieldError> {
        validate_image_fields(&self.name, &self.extension)
    }

    pub fn into_record(self, id: ImageId) -> ImageRecord {
        ImageRecord {
            id,
            group: self.group,
            unique_token: self.unique_token,
            name: self.name,
            extension: self.extension,
            is_temp: self.is_temp,
            uploaded_at: self.uploaded_at,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            size: self.size,
        }
    }
}

/// A stored image. Width, height and size describe the original file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub group: Option<String>,
    /// Empty only for records that predate tokens; see
    /// [`migrate_legacy_names`](crate::maintenance::migrate_legacy_names).
    #[serde(default)]
    pub unique_token: String,
    pub name: String,
    pub extension: String,
    #[serde(default)]
    pub is_temp: bool,
    pub uploaded_at: i64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl ImageRecord {
    pub fn validate(&self) -> Vec<FieldError> {
        validate_image_fields(&self.name, &self.extension)
    }

    /// Original file name as uploaded.
    pub fn display_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}

fn validate_image_fields(name: &str, extension: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(FieldError::new("name", "cannot be blank"));
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(FieldError::new(
            "name",
            format!("should contain at most {MAX_NAME_LEN} characters"),
        ));
    }
    if extension.chars().count() > MAX_EXTENSION_LEN {
        errors.push(FieldError::new(
            "extension",
            format!("should contain at most {MAX_EXTENSION_LEN} characters"),
        ));
    } else if extension.contains(['/', '\\']) {
        errors.push(FieldError::new("extension", "cannot contain path separators"));
    }
    errors
}

/// A version that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub image_id: ImageId,
    pub version: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

impl NewVersion {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.version.is_empty() {
            errors.push(FieldError::new("version", "cannot be blank"));
        } else if self.version.chars().count() > MAX_VERSION_NAME_LEN {
            errors.push(FieldError::new(
                "version",
                format!("should contain at most {MAX_VERSION_NAME_LEN} characters"),
            ));
        }
        errors
    }

    pub fn into_record(self, id: VersionId) -> VersionRecord {
        VersionRecord {
            id,
            image_id: self.image_id,
            version: self.version,
            width: self.width,
            height: self.height,
            size: self.size,
        }
    }
}

/// A stored version of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: VersionId,
    pub image_id: ImageId,
    pub version: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

/// The persistence API the core consumes.
///
/// Implementations allocate ids on insert, run the record's `validate()`
/// and reject a version whose name already exists for its image.
/// Deleting an image record must also drop its version records; the files
/// are the caller's concern.
pub trait ImageRepository: Sync {
    fn insert_image(&self, image: NewImage) -> Result<ImageRecord, PersistenceError>;

    fn update_image(&self, image: &ImageRecord) -> Result<(), PersistenceError>;

    fn delete_image(&self, id: ImageId) -> Result<(), PersistenceError>;

    fn find_image(&self, id: ImageId) -> Result<Option<ImageRecord>, PersistenceError>;

    fn list_images(&self) -> Result<Vec<ImageRecord>, PersistenceError>;

    fn insert_version(&self, version: NewVersion) -> Result<VersionRecord, PersistenceError>;

    fn delete_version(&self, id: VersionId) -> Result<(), PersistenceError>;

    /// Versions of one image, in insertion order.
    fn versions_of(&self, image_id: ImageId) -> Result<Vec<VersionRecord>, PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::new_image;

    #[test]
    fn valid_image_has_no_errors() {
        assert!(new_image("photo", "jpg").validate().is_empty());
    }

    #[test]
    fn blank_name_is_rejected() {
        let errors = new_image("", "jpg").validate();
        assert_eq!(errors, vec![FieldError::new("name", "cannot be blank")]);
    }

    #[test]
    fn overlong_fields_are_rejected() {
        let errors = new_image(&"n".repeat(256), "abcdefghijk").validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "extension"]);
    }

    #[test]
    fn extension_with_separator_is_rejected() {
        for extension in ["b/x", "..\\x", "/"] {
            let errors = new_image("a", extension).validate();
            assert_eq!(
                errors,
                vec![FieldError::new("extension", "cannot contain path separators")],
                "{extension}"
            );
        }
    }

    #[test]
    fn version_name_limits() {
        let version = NewVersion {
            image_id: 1,
            version: "v".repeat(46),
            width: 1,
            height: 1,
            size: 1,
        };
        assert_eq!(version.validate().len(), 1);
        let ok = NewVersion {
            version: "thumb".to_string(),
            ..version
        };
        assert!(ok.validate().is_empty());
    }

    #[test]
    fn rejected_error_lists_fields() {
        let err = PersistenceError::Rejected(vec![
            FieldError::new("name", "cannot be blank"),
            FieldError::new("extension", "too long"),
        ]);
        assert_eq!(
            err.to_string(),
            "record rejected: name: cannot be blank; extension: too long"
        );
    }

    #[test]
    fn display_name_joins_extension() {
        let record = new_image("photo.final", "jpg").into_record(3);
        assert_eq!(record.display_name(), "photo.final.jpg");
        let bare = new_image("README", "").into_record(4);
        assert_eq!(bare.display_name(), "README");
    }

    #[test]
    fn legacy_record_without_token_deserializes() {
        let json = r#"{"id": 7, "group": null, "name": "a", "extension": "png", "uploaded_at": 0}"#;
        let record: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.unique_token, "");
        assert!(!record.is_temp);
        assert_eq!(record.width, None);
    }
}
