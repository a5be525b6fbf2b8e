//! The managed prefix: the tool's sole writable territory.
//!
//! A [`Prefix`] is constructed once at startup and passed by reference into
//! every pipeline component; no component reads ambient environment state.
//! It holds the managed binary, share, and temporary directories plus a
//! snapshot of the process search path taken at construction time.
//!
//! Layout under the root:
//!
//! ```text
//! <root>/bin     final executables (one file per artifact)
//! <root>/share   retained full installations (one directory per artifact)
//! <root>/tmp     per-run scratch space, cleared at start, removed at end
//! ```

use crate::error::{Result, ToolshedError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Immutable managed-directory layout plus a search-path snapshot.
#[derive(Debug, Clone)]
pub struct Prefix {
    /// Root of the managed tree. Everything the pipeline writes lives
    /// inside it.
    pub root: PathBuf,
    /// Final destination for relocated binaries.
    pub bin: PathBuf,
    /// Destination for retain-mode installations.
    pub share: PathBuf,
    /// Ephemeral working directory; each artifact owns a subdirectory.
    pub tmp: PathBuf,
    /// The search-path entries visible to this process, in order.
    pub search_path: Vec<PathBuf>,
}

impl Prefix {
    /// Build a prefix rooted at `root` with an explicit search path.
    ///
    /// The root must be absolute and already exist; `bin` and `share` are
    /// created if missing. `tmp` is not touched here — call
    /// [`Prefix::prepare_tmp`] before a run.
    pub fn new(root: PathBuf, search_path: Vec<PathBuf>) -> Result<Self> {
        if !root.is_absolute() {
            return Err(ToolshedError::PrefixInvalid {
                message: format!("prefix root must be absolute, got {}", root.display()),
            });
        }
        if !root.is_dir() {
            return Err(ToolshedError::PrefixInvalid {
                message: format!("prefix root {} does not exist", root.display()),
            });
        }

        let bin = root.join("bin");
        let share = root.join("share");
        let tmp = root.join("tmp");
        fs::create_dir_all(&bin)?;
        fs::create_dir_all(&share)?;

        Ok(Self {
            root,
            bin,
            share,
            tmp,
            search_path,
        })
    }

    /// Build a prefix from `TOOLSHED_ROOT` (or the platform data dir) and
    /// the current `PATH`. This is the only place environment state is
    /// read; the result is passed everywhere else by reference.
    pub fn from_env() -> Result<Self> {
        let root = match std::env::var_os("TOOLSHED_ROOT") {
            Some(val) => PathBuf::from(val),
            None => dirs::data_local_dir()
                .ok_or_else(|| ToolshedError::PrefixInvalid {
                    message: "no TOOLSHED_ROOT set and no platform data directory".into(),
                })?
                .join("toolshed"),
        };
        fs::create_dir_all(&root)?;
        Self::new(root, parse_search_path())
    }

    /// Clear and recreate the temporary directory for a fresh run.
    pub fn prepare_tmp(&self) -> Result<()> {
        remove_dir_if_exists(&self.tmp)?;
        fs::create_dir_all(&self.tmp)?;
        Ok(())
    }

    /// Remove the temporary directory. Best-effort at process end.
    pub fn cleanup_tmp(&self) {
        if let Err(err) = remove_dir_if_exists(&self.tmp) {
            tracing::debug!(tmp = %self.tmp.display(), error = %err, "leaving tmp behind");
        }
    }

    /// The scratch directory owned by a single artifact.
    pub fn workdir(&self, name: &str) -> PathBuf {
        self.tmp.join(name)
    }

    /// Final binary destination for an artifact.
    pub fn bin_destination(&self, name: &str) -> PathBuf {
        self.bin.join(name)
    }

    /// Retained-installation destination for an artifact.
    pub fn share_destination(&self, name: &str) -> PathBuf {
        self.share.join(name)
    }

    /// Whether a resolved path lies inside the managed tree.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Whether a directory appears as an exact entry of the search path.
    ///
    /// Exact comparison on purpose: a retained installation is only
    /// reachable if the operator wired that literal directory into PATH.
    pub fn on_search_path(&self, dir: &Path) -> bool {
        self.search_path.iter().any(|entry| entry == dir)
    }
}

/// Split the process `PATH` into entries, preserving order.
pub fn parse_search_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
