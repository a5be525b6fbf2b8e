//! Finalizing artifact placement.
//!
//! Takes a verified archive sitting in the artifact's working directory
//! and turns it into an installed tool: extract, locate the binary, then
//! either move the binary alone into the managed `bin/` directory or keep
//! the whole extracted tree under `share/<name>` (retain mode).
//!
//! Retain mode deliberately does not symlink or copy the binary into
//! `bin/`: the tool's own directory must be wired into the search path by
//! the operator, and the installer fails loudly when it is not.

use crate::archive;
use crate::artifact::Artifact;
use crate::error::{Result, ToolshedError};
use crate::locate;
use crate::prefix::Prefix;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Installs extracted artifacts into the managed tree.
pub struct Installer<'a> {
    prefix: &'a Prefix,
}

impl<'a> Installer<'a> {
    pub fn new(prefix: &'a Prefix) -> Self {
        Self { prefix }
    }

    /// Extract `archive_path` and finalize placement for `artifact`.
    ///
    /// The archive must live inside the artifact's private working
    /// directory; extraction lands next to it and the archive file itself
    /// is deleted afterwards so a retain-mode directory move carries only
    /// extracted content.
    pub fn install(&self, artifact: &Artifact, archive_path: &Path) -> Result<()> {
        let workdir = archive::extract(archive_path)?;
        fs::remove_file(archive_path)?;

        let destination = self.prefix.bin_destination(&artifact.name);
        remove_file_if_exists(&destination)?;

        if artifact.retain_dir {
            self.install_retained(artifact, &workdir)?;
        } else {
            self.install_binary(artifact, &workdir)?;
        }
        info!(artifact = %artifact.name, "installed");
        Ok(())
    }

    /// Move the whole extraction into `share/<name>` and verify the
    /// binary's directory is reachable via the search path.
    fn install_retained(&self, artifact: &Artifact, workdir: &Path) -> Result<()> {
        let share_dir = self.prefix.share_destination(&artifact.name);
        remove_dir_if_exists(&share_dir)?;
        fs::rename(workdir, &share_dir).map_err(|source| ToolshedError::Placement {
            name: artifact.name.clone(),
            from: workdir.to_path_buf(),
            to: share_dir.clone(),
            source,
        })?;
        debug!(artifact = %artifact.name, dir = %share_dir.display(), "retained installation");

        let binary =
            locate::find_binary(&artifact.name, &share_dir).ok_or_else(|| {
                ToolshedError::BinaryNotFound {
                    name: artifact.name.clone(),
                    root: share_dir.clone(),
                }
            })?;
        let bin_dir = binary.parent().expect("located binary has a parent");
        if !self.prefix.on_search_path(bin_dir) {
            return Err(ToolshedError::DirNotOnSearchPath {
                name: artifact.name.clone(),
                dir: bin_dir.to_path_buf(),
            });
        }
        set_executable(&binary)?;
        Ok(())
    }

    /// Move only the located binary into `bin/<name>`; the rest of the
    /// extraction stays behind in the ephemeral working directory.
    fn install_binary(&self, artifact: &Artifact, workdir: &Path) -> Result<()> {
        let binary =
            locate::find_binary(&artifact.name, workdir).ok_or_else(|| {
                ToolshedError::BinaryNotFound {
                    name: artifact.name.clone(),
                    root: workdir.to_path_buf(),
                }
            })?;
        let destination = self.prefix.bin_destination(&artifact.name);
        fs::rename(&binary, &destination).map_err(|source| ToolshedError::Placement {
            name: artifact.name.clone(),
            from: binary.clone(),
            to: destination.clone(),
            source,
        })?;
        set_executable(&destination)?;
        Ok(())
    }
}

fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
