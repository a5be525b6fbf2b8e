//! Artifact model.
//!
//! An [`Artifact`] is the unit of provisioning work: one installable tool,
//! described by its canonical name (which doubles as the expected executable
//! base name), how to obtain it, and what "installed correctly" means.

use std::fmt;

/// How an artifact gets onto the machine.
///
/// Exactly one source exists per artifact; the enum makes the
/// "download link requires a checksum, custom install excludes both"
/// invariant impossible to violate after manifest validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// Fetch a release asset over HTTP and verify its digest.
    DirectDownload {
        /// Fixed per-artifact URL of the release asset.
        url: String,
        /// Lowercase hex SHA-256 of the complete asset.
        sha256: String,
    },
    /// Run a fixed list of shell commands instead of the
    /// download/extract/locate/install sequence. Used when the tool must
    /// be built or fetched via a package manager.
    Custom {
        /// Commands run sequentially; any failure aborts this artifact.
        commands: Vec<String>,
    },
}

impl InstallSource {
    /// Short label used in logs and `list` output.
    pub fn kind(&self) -> &'static str {
        match self {
            InstallSource::DirectDownload { .. } => "download",
            InstallSource::Custom { .. } => "custom",
        }
    }
}

/// One installable tool.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Canonical name; also the executable base name the locator and
    /// health checker look for.
    pub name: String,

    /// How to obtain the tool.
    pub source: InstallSource,

    /// Exact expected output of `<binary> <version_flag>`, trailing
    /// newline stripped. `None` skips the version comparison.
    pub version: Option<String>,

    /// Flag passed to the binary to print its version.
    pub version_flag: String,

    /// Shell command overriding the default health check; exit 0 means
    /// healthy.
    pub health: Option<String>,

    /// Keep the whole extracted tree under `share/<name>` instead of
    /// moving only the binary into `bin/`. Useful for tools that carry a
    /// runtime directory next to the executable.
    pub retain_dir: bool,
}

impl Artifact {
    /// Whether this artifact goes through the download pipeline.
    pub fn is_download(&self) -> bool {
        matches!(self.source, InstallSource::DirectDownload { .. })
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.source.kind())
    }
}
