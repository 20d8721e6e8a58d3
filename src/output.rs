//! CLI output formatting.
//!
//! Output is **record-centric**: each image is shown by id and uploaded
//! name, with the stored file, dimensions and public URL of the original and
//! of every version as indented context lines.
//!
//! ```text
//! Image 12 dawn.jpg (gallery, temp)
//!     original: 1600x1200, 412.0 KB → /images/12_Xq3...9Lk.jpg
//!     thumb: 150x150, 8.2 KB → /images/12_Xq3...9Lk_thumb.jpg
//!     large: 1200x900, 201.7 KB → /images/12_Xq3...9Lk_large.jpg
//! ```
//!
//! Each `format_*` function returns lines for testability; the `print_*`
//! wrappers write them to stdout.

use crate::maintenance::MigrationReport;
use crate::naming::StorageNamer;
use crate::records::{ImageId, ImageRecord, VersionRecord};
use std::path::PathBuf;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn dimensions(width: Option<u32>, height: Option<u32>) -> String {
    match (width, height) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "?x?".to_string(),
    }
}

fn image_header(image: &ImageRecord) -> String {
    let mut tags = Vec::new();
    if let Some(group) = &image.group {
        tags.push(group.as_str());
    }
    if image.is_temp {
        tags.push("temp");
    }
    if tags.is_empty() {
        format!("Image {} {}", image.id, image.display_name())
    } else {
        format!(
            "Image {} {} ({})",
            image.id,
            image.display_name(),
            tags.join(", ")
        )
    }
}

// ============================================================================
// Image display
// ============================================================================

pub fn format_image(
    image: &ImageRecord,
    versions: &[VersionRecord],
    namer: &StorageNamer,
) -> Vec<String> {
    let mut lines = vec![image_header(image)];
    let size = image.size.map(format_size).unwrap_or_else(|| "?".into());
    lines.push(format!(
        "{}original: {}, {} → {}",
        indent(1),
        dimensions(image.width, image.height),
        size,
        namer.original_url(image)
    ));
    for version in versions {
        lines.push(format!(
            "{}{}: {}x{}, {} → {}",
            indent(1),
            version.version,
            version.width,
            version.height,
            format_size(version.size),
            namer.version_url(image, &version.version)
        ));
    }
    lines
}

pub fn print_image(image: &ImageRecord, versions: &[VersionRecord], namer: &StorageNamer) {
    for line in format_image(image, versions, namer) {
        println!("{line}");
    }
}

// ============================================================================
// Maintenance
// ============================================================================

pub fn format_migration(report: &MigrationReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (from, to) in &report.renamed {
        lines.push(format!("{} → {}", from.display(), to.display()));
    }
    lines.push(format!(
        "Assigned {} token(s), renamed {} file(s)",
        report.tokens_assigned,
        report.renamed.len()
    ));
    lines
}

pub fn format_sweep(orphans: &[PathBuf], dry_run: bool) -> Vec<String> {
    let verb = if dry_run { "Would remove" } else { "Removed" };
    let mut lines: Vec<String> = orphans
        .iter()
        .map(|p| format!("{}{}", indent(1), p.display()))
        .collect();
    lines.insert(0, format!("{verb} {} orphaned file(s)", orphans.len()));
    lines
}

pub fn format_purge(ids: &[ImageId]) -> Vec<String> {
    if ids.is_empty() {
        return vec!["No temp images to purge".to_string()];
    }
    let list: Vec<String> = ids.iter().map(ImageId::to_string).collect();
    vec![format!(
        "Purged {} temp image(s): {}",
        ids.len(),
        list.join(", ")
    )]
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
