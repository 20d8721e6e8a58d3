//! Explicit maintenance passes over the images root.
//!
//! None of these run as part of normal workflows; the CLI exposes each as a
//! subcommand.
//!
//! | Pass | Effect |
//! |------|--------|
//! | [`migrate_legacy_names`] | give token-less images a token, rename `{id}[_{version}].{ext}` files |
//! | [`sweep_orphans`] | delete stored files that no record references |
//! | [`purge_temp_images`] | delete temp images uploaded before a cutoff |

use crate::imaging::ImageBackend;
use crate::naming::{StorageNamer, generate_token, parse_stored_name};
use crate::records::{ImageId, ImageRepository, PersistenceError};
use crate::store::{FileStore, FileStoreError};
use crate::versions::{VersionOrchestrator, WorkflowError};
use log::{debug, info};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error(transparent)]
    Files(#[from] FileStoreError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Images that had no token before this run.
    pub tokens_assigned: usize,
    /// `(legacy, tokenized)` renames, in the order performed.
    pub renamed: Vec<(PathBuf, PathBuf)>,
}

/// Move files from the pre-token layout to the tokenized one.
///
/// A file is renamed only when the legacy file exists and the target does
/// not, so running the pass again changes nothing.
pub fn migrate_legacy_names<B, F, R>(
    orchestrator: &VersionOrchestrator<'_, B, F, R>,
) -> Result<MigrationReport, MaintenanceError>
where
    B: ImageBackend,
    F: FileStore,
    R: ImageRepository,
{
    let records = orchestrator.records();
    let files = orchestrator.files();
    let namer = orchestrator.namer();
    let mut report = MigrationReport::default();

    for mut image in records.list_images()? {
        if image.unique_token.is_empty() {
            image.unique_token = generate_token();
            records.update_image(&image)?;
            report.tokens_assigned += 1;
            info!("assigned token to image {}", image.id);
        }

        let versions = records.versions_of(image.id)?;
        let names = std::iter::once(None).chain(versions.iter().map(|v| Some(v.version.as_str())));
        for version in names {
            let legacy = namer.legacy_path(&image, version);
            let target = namer.path(&StorageNamer::stored_name(&image, version));
            if files.exists(&legacy) && !files.exists(&target) {
                files.rename(&legacy, &target)?;
                info!("renamed {} -> {}", legacy.display(), target.display());
                report.renamed.push((legacy, target));
            }
        }
    }
    Ok(report)
}

/// Delete (or with `dry_run`, only list) files under the images root whose
/// tokenized name no record references.
///
/// Files whose name does not parse as a stored name are never touched.
pub fn sweep_orphans<B, F, R>(
    orchestrator: &VersionOrchestrator<'_, B, F, R>,
    dry_run: bool,
) -> Result<Vec<PathBuf>, MaintenanceError>
where
    B: ImageBackend,
    F: FileStore,
    R: ImageRepository,
{
    let records = orchestrator.records();
    let namer = orchestrator.namer();

    let mut referenced = HashSet::new();
    for image in records.list_images()? {
        referenced.insert(StorageNamer::stored_name(&image, None));
        for version in records.versions_of(image.id)? {
            referenced.insert(StorageNamer::stored_name(&image, Some(&version.version)));
        }
    }

    let mut orphans = Vec::new();
    for path in orchestrator.files().list(namer.root())? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if parse_stored_name(name).is_none() {
            debug!("sweep: leaving unrecognized {}", path.display());
            continue;
        }
        if referenced.contains(name) {
            continue;
        }
        if !dry_run {
            orchestrator.files().delete(&path)?;
            info!("removed orphan {}", path.display());
        }
        orphans.push(path);
    }
    Ok(orphans)
}

/// Delete, with cascade, every temp image uploaded before `cutoff` (unix
/// seconds). Returns the ids removed.
pub fn purge_temp_images<B, F, R>(
    orchestrator: &VersionOrchestrator<'_, B, F, R>,
    cutoff: i64,
) -> Result<Vec<ImageId>, MaintenanceError>
where
    B: ImageBackend,
    F: FileStore,
    R: ImageRepository,
{
    let mut purged = Vec::new();
    for image in orchestrator.records().list_images()? {
        if image.is_temp && image.uploaded_at < cutoff {
            orchestrator.delete_image(&image)?;
            purged.push(image.id);
        }
    }
    if !purged.is_empty() {
        info!("purged {} temp image(s)", purged.len());
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::legacy_file_name;
    use crate::records::NewVersion;
    use crate::test_helpers::{Harness, TOKEN, new_image, png_bytes, upload};
    use std::path::Path;

    fn legacy_image(h: &Harness) -> crate::records::ImageRecord {
        let mut draft = new_image("old", "jpg");
        draft.unique_token = String::new();
        let image = h.records.insert_image(draft).unwrap();
        h.records
            .insert_version(NewVersion {
                image_id: image.id,
                version: "thumb".into(),
                width: 1,
                height: 1,
                size: 1,
            })
            .unwrap();
        let root = Path::new("/store");
        h.files.put(&root.join(legacy_file_name(image.id, None, "jpg")), b"o");
        h.files
            .put(&root.join(legacy_file_name(image.id, Some("thumb"), "jpg")), b"t");
        image
    }

    // =========================================================================
    // migrate_legacy_names
    // =========================================================================

    #[test]
    fn migration_assigns_token_and_renames_files() {
        let h = Harness::new();
        let image = legacy_image(&h);
        let orch = h.orchestrator();

        let report = migrate_legacy_names(&orch).unwrap();

        let migrated = h.records.image(image.id);
        assert_eq!(migrated.unique_token.len(), 32);
        assert_eq!(report.tokens_assigned, 1);
        assert_eq!(report.renamed.len(), 2);
        let token = &migrated.unique_token;
        let mut expected = vec![
            format!("{}_{token}.jpg", image.id),
            format!("{}_{token}_thumb.jpg", image.id),
        ];
        expected.sort();
        assert_eq!(h.files.names(), expected);
        assert_eq!(
            h.files.get(&orch.namer().version_path(&migrated, "thumb")),
            Some(b"t".to_vec())
        );
    }

    #[test]
    fn migration_is_idempotent() {
        let h = Harness::new();
        legacy_image(&h);
        let orch = h.orchestrator();
        migrate_legacy_names(&orch).unwrap();
        let names = h.files.names();

        let second = migrate_legacy_names(&orch).unwrap();

        assert_eq!(second, MigrationReport::default());
        assert_eq!(h.files.names(), names);
    }

    #[test]
    fn migration_keeps_existing_targets() {
        let h = Harness::new();
        let image = h.records.insert_image(new_image("new", "jpg")).unwrap();
        let orch = h.orchestrator();
        let legacy = orch.namer().legacy_path(&image, None);
        let target = orch.namer().original_path(&image);
        h.files.put(&legacy, b"legacy");
        h.files.put(&target, b"current");

        let report = migrate_legacy_names(&orch).unwrap();

        assert!(report.renamed.is_empty());
        assert_eq!(h.files.get(&target), Some(b"current".to_vec()));
        assert_eq!(h.records.image(image.id).unique_token, TOKEN);
    }

    // =========================================================================
    // sweep_orphans
    // =========================================================================

    #[test]
    fn sweep_removes_only_unreferenced_stored_names() {
        let h = Harness::new();
        let orch = h.orchestrator();
        let image = orch
            .create_from_source(Some("gallery"), &upload("photo.png", png_bytes(100, 50)), false)
            .unwrap();
        let root = Path::new("/store");
        let orphan = root.join(format!("99_{TOKEN}_thumb.png"));
        h.files.put(&orphan, b"x");
        h.files.put(&root.join("notes.txt"), b"x");
        h.files.put(&root.join("5_thumb.png"), b"x");

        let removed = sweep_orphans(&orch, false).unwrap();

        assert_eq!(removed, vec![orphan.clone()]);
        assert!(!h.files.exists(&orphan));
        assert!(h.files.exists(&root.join("notes.txt")));
        assert!(h.files.exists(&root.join("5_thumb.png")));
        assert!(h.files.exists(&orch.namer().version_path(&image, "large")));
    }

    #[test]
    fn sweep_dry_run_deletes_nothing() {
        let h = Harness::new();
        let orch = h.orchestrator();
        let orphan = Path::new("/store").join(format!("3_{TOKEN}.jpg"));
        h.files.put(&orphan, b"x");

        assert_eq!(sweep_orphans(&orch, true).unwrap(), vec![orphan.clone()]);
        assert!(h.files.exists(&orphan));
    }

    // =========================================================================
    // purge_temp_images
    // =========================================================================

    #[test]
    fn purge_removes_old_temp_images_only() {
        let h = Harness::new();
        let orch = h.orchestrator();
        let mut old_temp = upload("a.png", png_bytes(10, 10));
        old_temp.uploaded_at = 100;
        let mut new_temp = upload("b.png", png_bytes(10, 10));
        new_temp.uploaded_at = 500;
        let mut old_kept = upload("c.png", png_bytes(10, 10));
        old_kept.uploaded_at = 100;

        let purged_image = orch
            .create_from_source(Some("gallery"), &old_temp, true)
            .unwrap();
        orch.create_from_source(None, &new_temp, true).unwrap();
        orch.create_from_source(None, &old_kept, false).unwrap();

        let purged = purge_temp_images(&orch, 200).unwrap();

        assert_eq!(purged, vec![purged_image.id]);
        assert_eq!(h.records.image_count(), 2);
        assert_eq!(h.files.paths().len(), 2);
    }
}
