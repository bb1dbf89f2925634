//! Filesystem blob sink for uploaded images.
//!
//! Every upload gets a fresh random name, so concurrent requests can never
//! collide or overwrite one another; no locking is involved. The returned
//! reference is the stable path the HTTP layer serves the file back under.

use anyhow::{Context, Result};
use std::path::Path;
use uuid::Uuid;

/// Extension used when the original filename has none. Matches the MIME
/// default sent to the model.
const DEFAULT_EXTENSION: &str = "png";

/// A stored upload: the on-disk file name and its retrievable reference.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub reference: String,
}

/// Write image bytes under `dir` with a collision-free name, preserving the
/// original file extension when it has a sane one.
pub fn save_upload(dir: &Path, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create uploads directory: {}", dir.display()))?;

    let ext = extension_of(original_name).unwrap_or(DEFAULT_EXTENSION);
    let file_name = format!("{}.{}", Uuid::new_v4().simple(), ext);
    let path = dir.join(&file_name);

    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write upload: {}", path.display()))?;

    Ok(StoredUpload {
        reference: format!("/uploads/{}", file_name),
        file_name,
    })
}

/// MIME type for the model request, inferred from the filename.
/// Unrecognized extensions fall back to PNG.
pub fn mime_for(name: &str) -> &'static str {
    match extension_of(name).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// The extension of a filename, if it has an alphanumeric one.
fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}
