//! Manifest loading, parsing, and validation.
//!
//! The manifest is a YAML file mapping tool names to their sources:
//!
//! ```yaml
//! tools:
//!   fzf:
//!     url: https://github.com/junegunn/fzf/releases/download/v0.64.0/fzf-0.64.0-linux_amd64.tar.gz
//!     sha256: c71d2528e090de5d4765017d745f8a4fed44b43703f93247a28f6dc2aa4c7c01
//!     version: "0.64.0 (d226d841)"
//!   nvim:
//!     url: https://github.com/neovim/neovim/releases/download/v0.11.3/nvim-linux-x86_64.tar.gz
//!     sha256: 17d22826f19fe28a11f9ab4bee13c43399fdcce485eabfa2bea6c5b3d660740f
//!     retain_dir: true
//!   tokei:
//!     install:
//!       - cargo install --quiet tokei --version=12.1.2
//! ```
//!
//! Tool names are map keys, so iteration (and therefore custom-install
//! execution order) is lexicographic and reproducible.

use crate::artifact::{Artifact, InstallSource};
use crate::error::{Result, ToolshedError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default flag used to probe an installed binary's version.
pub const DEFAULT_VERSION_FLAG: &str = "--version";

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    tools: BTreeMap<String, ToolEntry>,
}

/// One tool as written in the manifest.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolEntry {
    url: Option<String>,
    sha256: Option<String>,
    version: Option<String>,
    version_flag: Option<String>,
    health: Option<String>,
    #[serde(default)]
    retain_dir: bool,
    #[serde(default)]
    install: Vec<String>,
}

/// Load and validate a manifest, returning artifacts sorted by name.
pub fn load(path: &Path) -> Result<Vec<Artifact>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolshedError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    parse(&contents).map_err(|err| match err {
        ToolshedError::ManifestParse { message, .. } => ToolshedError::ManifestParse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parse manifest contents. Exposed for tests and in-memory callers.
pub fn parse(contents: &str) -> Result<Vec<Artifact>> {
    let file: ManifestFile =
        serde_yaml::from_str(contents).map_err(|err| ToolshedError::ManifestParse {
            path: Default::default(),
            message: err.to_string(),
        })?;

    let mut artifacts = Vec::with_capacity(file.tools.len());
    for (name, entry) in file.tools {
        artifacts.push(convert(name, entry)?);
    }
    Ok(artifacts)
}

fn convert(name: String, entry: ToolEntry) -> Result<Artifact> {
    if name.is_empty() || name.contains('/') {
        return Err(ToolshedError::ManifestValidation {
            message: format!("'{name}' is not a valid tool name"),
        });
    }

    let source = match (entry.url, entry.sha256, entry.install.is_empty()) {
        (Some(url), Some(sha256), true) => {
            validate_sha256(&name, &sha256)?;
            InstallSource::DirectDownload { url, sha256 }
        }
        (None, None, false) => InstallSource::Custom {
            commands: entry.install,
        },
        (Some(_), None, _) => {
            return Err(ToolshedError::ManifestValidation {
                message: format!("'{name}' has a url but no sha256"),
            });
        }
        (None, Some(_), _) => {
            return Err(ToolshedError::ManifestValidation {
                message: format!("'{name}' has a sha256 but no url"),
            });
        }
        (Some(_), Some(_), false) => {
            return Err(ToolshedError::ManifestValidation {
                message: format!("'{name}' has both a url and install commands; pick one"),
            });
        }
        (None, None, true) => {
            return Err(ToolshedError::ManifestValidation {
                message: format!("'{name}' has neither a url nor install commands"),
            });
        }
    };

    Ok(Artifact {
        name,
        source,
        version: entry.version,
        version_flag: entry
            .version_flag
            .unwrap_or_else(|| DEFAULT_VERSION_FLAG.to_string()),
        health: entry.health,
        retain_dir: entry.retain_dir,
    })
}

fn validate_sha256(name: &str, digest: &str) -> Result<()> {
    let valid = digest.len() == 64
        && digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if valid {
        Ok(())
    } else {
        Err(ToolshedError::ManifestValidation {
            message: format!("'{name}' sha256 must be 64 lowercase hex characters"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_SUM: &str = "c71d2528e090de5d4765017d745f8a4fed44b43703f93247a28f6dc2aa4c7c01";

    #[test]
    fn parses_download_entry() {
        let yaml = format!(
            r#"
tools:
  fzf:
    url: https://example.com/fzf.tar.gz
    sha256: {GOOD_SUM}
    version: "0.64.0"
"#
        );
        let artifacts = parse(&yaml).unwrap();
        assert_eq!(artifacts.len(), 1);
        let fzf = &artifacts[0];
        assert_eq!(fzf.name, "fzf");
        assert_eq!(fzf.version.as_deref(), Some("0.64.0"));
        assert_eq!(fzf.version_flag, "--version");
        assert!(!fzf.retain_dir);
        match &fzf.source {
            InstallSource::DirectDownload { url, sha256 } => {
                assert_eq!(url, "https://example.com/fzf.tar.gz");
                assert_eq!(sha256, GOOD_SUM);
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn parses_custom_entry() {
        let yaml = r#"
tools:
  tokei:
    install:
      - cargo install --quiet tokei --version=12.1.2
"#;
        let artifacts = parse(yaml).unwrap();
        match &artifacts[0].source {
            InstallSource::Custom { commands } => assert_eq!(commands.len(), 1),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn artifacts_come_back_sorted_by_name() {
        let yaml = format!(
            r#"
tools:
  rg:
    url: https://example.com/rg.tar.gz
    sha256: {GOOD_SUM}
  fd:
    url: https://example.com/fd.tar.gz
    sha256: {GOOD_SUM}
  lazygit:
    url: https://example.com/lazygit.tar.gz
    sha256: {GOOD_SUM}
"#
        );
        let names: Vec<String> = parse(&yaml).unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["fd", "lazygit", "rg"]);
    }

    #[test]
    fn url_without_sha256_is_rejected() {
        let yaml = r#"
tools:
  fd:
    url: https://example.com/fd.tar.gz
"#;
        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("no sha256"));
    }

    #[test]
    fn entry_with_no_source_is_rejected() {
        let yaml = r#"
tools:
  fd:
    version: "10.2.0"
"#;
        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("neither"));
    }

    #[test]
    fn entry_with_both_sources_is_rejected() {
        let yaml = format!(
            r#"
tools:
  fd:
    url: https://example.com/fd.tar.gz
    sha256: {GOOD_SUM}
    install:
      - brew install fd
"#
        );
        let err = parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn uppercase_sha256_is_rejected() {
        let yaml = format!(
            r#"
tools:
  fd:
    url: https://example.com/fd.tar.gz
    sha256: {}
"#,
            GOOD_SUM.to_uppercase()
        );
        let err = parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("lowercase hex"));
    }

    #[test]
    fn short_sha256_is_rejected() {
        let yaml = r#"
tools:
  fd:
    url: https://example.com/fd.tar.gz
    sha256: abc123
"#;
        assert!(parse(yaml).is_err());
    }

    #[test]
    fn custom_version_flag_is_kept() {
        let yaml = format!(
            r#"
tools:
  go:
    url: https://example.com/go.tar.gz
    sha256: {GOOD_SUM}
    version_flag: version
"#
        );
        let artifacts = parse(&yaml).unwrap();
        assert_eq!(artifacts[0].version_flag, "version");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!(
            r#"
tools:
  fd:
    url: https://example.com/fd.tar.gz
    sha256: {GOOD_SUM}
    checksums: nope
"#
        );
        assert!(parse(&yaml).is_err());
    }

    #[test]
    fn load_missing_file_is_manifest_not_found() {
        let err = load(Path::new("/definitely/not/here/toolshed.yml")).unwrap_err();
        assert!(matches!(err, ToolshedError::ManifestNotFound { .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("toolshed.yml");
        std::fs::write(
            &path,
            format!(
                "tools:\n  fd:\n    url: https://example.com/fd.tar.gz\n    sha256: {GOOD_SUM}\n"
            ),
        )
        .unwrap();
        let artifacts = load(&path).unwrap();
        assert_eq!(artifacts[0].name, "fd");
    }
}
