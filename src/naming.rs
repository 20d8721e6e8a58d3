//! Stored file naming.
//!
//! Every original and version lives under the images root with a name that
//! embeds the record id and the image's random token:
//!
//! ```text
//! 12_Xq3...9Lk.jpg          original
//! 12_Xq3...9Lk_thumb.jpg    version "thumb"
//! 12_thumb.jpg              legacy layout (before tokens), see `maintenance`
//! ```
//!
//! The token is alphanumeric, so a stored name splits back into its parts
//! on the first two underscores. Version names may contain underscores.
//!
//! Paths and URLs are built from the same file name but never share
//! separators: paths are joined with [`Path::join`], URLs with `/`.

use crate::config::StoreConfig;
use crate::records::{ImageId, ImageRecord};
use crate::store::FileStore;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::path::{Path, PathBuf};

/// Length of a generated unique token.
pub const TOKEN_LEN: usize = 32;

/// A fresh random token for a new image.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// `{id}_{token}[_{version}].{ext}`.
///
/// An empty token falls back to the legacy layout so records that predate
/// tokens still resolve to their files.
pub fn file_name(id: ImageId, token: &str, version: Option<&str>, extension: &str) -> String {
    let mut name = id.to_string();
    if !token.is_empty() {
        name.push('_');
        name.push_str(token);
    }
    if let Some(version) = version {
        name.push('_');
        name.push_str(version);
    }
    if !extension.is_empty() {
        name.push('.');
        name.push_str(extension);
    }
    name
}

/// `{id}[_{version}].{ext}`, the layout used before tokens existed.
pub fn legacy_file_name(id: ImageId, version: Option<&str>, extension: &str) -> String {
    file_name(id, "", version, extension)
}

/// A stored file name split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredName {
    pub id: ImageId,
    pub token: String,
    pub version: Option<String>,
    pub extension: String,
}

fn is_token(s: &str) -> bool {
    s.len() == TOKEN_LEN && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Parse a tokenized file name. Legacy and foreign names return `None`.
pub fn parse_stored_name(name: &str) -> Option<StoredName> {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (name, ""),
    };
    let mut parts = stem.splitn(3, '_');
    let id = parts.next()?.parse::<ImageId>().ok()?;
    let token = parts.next().filter(|t| is_token(t))?;
    let version = match parts.next() {
        Some("") => return None,
        Some(v) => Some(v.to_string()),
        None => None,
    };
    Some(StoredName {
        id,
        token: token.to_string(),
        version,
        extension: extension.to_string(),
    })
}

/// Split an uploaded file name into base name and extension.
///
/// Only the last dot separates: `photo.final.JPG` → (`photo.final`, `JPG`).
/// A leading dot is part of the name.
pub fn split_file_name(file_name: &str) -> (String, String) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
        _ => (file_name.to_string(), String::new()),
    }
}

/// Resolves stored file names to paths under the images root and to URLs
/// under the public base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNamer {
    root: PathBuf,
    base_url: String,
}

impl StorageNamer {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.images_root.clone(), config.base_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }

    pub fn stored_name(image: &ImageRecord, version: Option<&str>) -> String {
        file_name(image.id, &image.unique_token, version, &image.extension)
    }

    pub fn original_path(&self, image: &ImageRecord) -> PathBuf {
        self.path(&Self::stored_name(image, None))
    }

    pub fn original_url(&self, image: &ImageRecord) -> String {
        self.url(&Self::stored_name(image, None))
    }

    pub fn version_path(&self, image: &ImageRecord, version: &str) -> PathBuf {
        self.path(&Self::stored_name(image, Some(version)))
    }

    pub fn version_url(&self, image: &ImageRecord, version: &str) -> String {
        self.url(&Self::stored_name(image, Some(version)))
    }

    pub fn legacy_path(&self, image: &ImageRecord, version: Option<&str>) -> PathBuf {
        self.path(&legacy_file_name(image.id, version, &image.extension))
    }

    /// Name of the first listed version whose file exists, else the original.
    fn first_existing_name(
        &self,
        image: &ImageRecord,
        versions: &[&str],
        files: &impl FileStore,
    ) -> String {
        versions
            .iter()
            .copied()
            .map(|v| Self::stored_name(image, Some(v)))
            .find(|name| files.exists(&self.path(name)))
            .unwrap_or_else(|| Self::stored_name(image, None))
    }

    pub fn first_existing_path(
        &self,
        image: &ImageRecord,
        versions: &[&str],
        files: &impl FileStore,
    ) -> PathBuf {
        self.path(&self.first_existing_name(image, versions, files))
    }

    pub fn first_existing_url(
        &self,
        image: &ImageRecord,
        versions: &[&str],
        files: &impl FileStore,
    ) -> String {
        self.url(&self.first_existing_name(image, versions, files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MemoryFileStore, TOKEN, stored_image};

    fn namer() -> StorageNamer {
        StorageNamer::new("/srv/www/images", "/images/")
    }

    #[test]
    fn token_is_alphanumeric_and_fixed_length() {
        let token = generate_token();
        assert!(is_token(&token), "{token}");
        assert_ne!(generate_token(), token);
    }

    #[test]
    fn original_omits_version_suffix() {
        assert_eq!(file_name(12, "abc", None, "jpg"), "12_abc.jpg");
        assert_eq!(file_name(12, "abc", Some("thumb"), "jpg"), "12_abc_thumb.jpg");
    }

    #[test]
    fn empty_token_uses_legacy_layout() {
        assert_eq!(file_name(5, "", Some("large"), "png"), "5_large.png");
        assert_eq!(legacy_file_name(5, None, "png"), "5.png");
    }

    #[test]
    fn missing_extension_has_no_dot() {
        assert_eq!(file_name(1, "t", None, ""), "1_t");
    }

    #[test]
    fn path_and_url_use_their_own_separators() {
        let image = stored_image(12, "jpg");
        assert_eq!(
            namer().version_path(&image, "thumb"),
            PathBuf::from(format!("/srv/www/images/12_{TOKEN}_thumb.jpg"))
        );
        assert_eq!(
            namer().original_url(&image),
            format!("/images/12_{TOKEN}.jpg")
        );
    }

    #[test]
    fn url_with_empty_base() {
        let namer = StorageNamer::new("root", "");
        assert_eq!(namer.url("1_t.jpg"), "/1_t.jpg");
    }

    #[test]
    fn legacy_path_ignores_token() {
        let image = stored_image(3, "gif");
        assert_eq!(
            namer().legacy_path(&image, Some("thumb")),
            PathBuf::from("/srv/www/images/3_thumb.gif")
        );
    }

    // =========================================================================
    // parse_stored_name
    // =========================================================================

    #[test]
    fn parse_original() {
        let parsed = parse_stored_name(&format!("12_{TOKEN}.jpg")).unwrap();
        assert_eq!(
            parsed,
            StoredName {
                id: 12,
                token: TOKEN.to_string(),
                version: None,
                extension: "jpg".to_string(),
            }
        );
    }

    #[test]
    fn parse_version_with_underscores() {
        let parsed = parse_stored_name(&format!("7_{TOKEN}_big_crop.webp")).unwrap();
        assert_eq!(parsed.id, 7);
        assert_eq!(parsed.version.as_deref(), Some("big_crop"));
        assert_eq!(parsed.extension, "webp");
    }

    #[test]
    fn parse_rejects_legacy_and_foreign_names() {
        assert_eq!(parse_stored_name("12_thumb.jpg"), None);
        assert_eq!(parse_stored_name("12.jpg"), None);
        assert_eq!(parse_stored_name("readme.txt"), None);
        assert_eq!(parse_stored_name(&format!("x_{TOKEN}.jpg")), None);
        assert_eq!(parse_stored_name(&format!("1_{TOKEN}_.jpg")), None);
    }

    #[test]
    fn parse_inverts_file_name() {
        let name = file_name(99, TOKEN, Some("large"), "png");
        let parsed = parse_stored_name(&name).unwrap();
        assert_eq!(
            file_name(parsed.id, &parsed.token, parsed.version.as_deref(), &parsed.extension),
            name
        );
    }

    #[test]
    fn split_uses_last_dot() {
        assert_eq!(
            split_file_name("photo.final.JPG"),
            ("photo.final".to_string(), "JPG".to_string())
        );
        assert_eq!(split_file_name("README"), ("README".to_string(), String::new()));
        assert_eq!(split_file_name(".hidden"), (".hidden".to_string(), String::new()));
    }

    // =========================================================================
    // first-existing lookup
    // =========================================================================

    #[test]
    fn first_existing_prefers_listed_order() {
        let image = stored_image(4, "jpg");
        let files = MemoryFileStore::new();
        let namer = namer();
        files.put(&namer.version_path(&image, "large"), b"x");
        files.put(&namer.version_path(&image, "small"), b"x");

        assert_eq!(
            namer.first_existing_url(&image, &["huge", "large", "small"], &files),
            format!("/images/4_{TOKEN}_large.jpg")
        );
    }

    #[test]
    fn first_existing_falls_back_to_original() {
        let image = stored_image(4, "jpg");
        let files = MemoryFileStore::new();
        assert_eq!(
            namer().first_existing_path(&image, &["thumb"], &files),
            namer().original_path(&image)
        );
    }
}
