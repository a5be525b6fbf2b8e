//! Archive-format-aware extraction.
//!
//! Dispatches purely on filename suffix: `.tar.gz` and `.tar.xz` are
//! streamed through a decompressor into `tar`, `.zip` is read as a
//! random-access archive entry by entry. Everything unpacks into the
//! archive's parent directory, which the orchestrator guarantees is the
//! artifact's private working directory.
//!
//! Zip quirks normalized here:
//! - entries under the macOS resource-fork marker (`__MACOSX`) are
//!   skipped entirely;
//! - directory entries and `.app` bundle paths become empty directories —
//!   a bundle is an opaque leaf, never descended into.

use crate::error::{Result, ToolshedError};
use anyhow::Context;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Path segment macOS inserts for resource forks; never materialized.
const MACOS_RESOURCE_FORK: &str = "__MACOSX";

/// Unpack `archive_path` into its parent directory.
///
/// Returns the directory the contents landed in. An unrecognized suffix
/// is a hard failure; nothing is extracted.
pub fn extract(archive_path: &Path) -> Result<PathBuf> {
    let file_name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let dest = archive_path
        .parent()
        .ok_or_else(|| ToolshedError::UnsupportedArchive {
            path: archive_path.to_path_buf(),
        })?
        .to_path_buf();

    debug!(archive = %archive_path.display(), dest = %dest.display(), "extracting");
    if file_name.ends_with(".tar.gz") {
        let file = File::open(archive_path)?;
        unpack_tar(GzDecoder::new(file), &dest)?;
    } else if file_name.ends_with(".tar.xz") {
        let file = File::open(archive_path)?;
        unpack_tar(XzDecoder::new(file), &dest)?;
    } else if file_name.ends_with(".zip") {
        let file = File::open(archive_path)?;
        unpack_zip(file, &dest)?;
    } else {
        return Err(ToolshedError::UnsupportedArchive {
            path: archive_path.to_path_buf(),
        });
    }
    Ok(dest)
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.unpack(dest)?;
    Ok(())
}

fn unpack_zip(file: File, dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(file).context("reading zip archive")?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context("reading zip entry")?;
        if entry.name().contains(MACOS_RESOURCE_FORK) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping zip entry with unsafe path");
            continue;
        };
        // A bundle is an opaque leaf: materialize the bundle directory
        // itself and drop everything beneath it.
        if let Some(bundle_root) = bundle_prefix(&relative) {
            fs::create_dir_all(dest.join(bundle_root))?;
            continue;
        }

        let out_path = dest.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

/// The leading sub-path up to and including the first `.app` component,
/// if any. macOS application bundles are treated as opaque single units.
fn bundle_prefix(path: &Path) -> Option<PathBuf> {
    let mut prefix = PathBuf::new();
    for component in path.components() {
        prefix.push(component);
        let is_app = Path::new(component.as_os_str())
            .extension()
            .and_then(|ext| ext.to_str())
            == Some("app");
        if is_app {
            return Some(prefix);
        }
    }
    None
}
