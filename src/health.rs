//! Per-artifact health checks.
//!
//! A health check decides whether any installation work is needed at all.
//! The default rule requires three things: the artifact's executable
//! resolves on the search path, the resolved path lies inside the managed
//! prefix (a system-wide install is a reason to reinstall, not to skip),
//! and — when a version is pinned — invoking the binary with its version
//! flag prints exactly the pinned string.
//!
//! An artifact may override the default with a shell command; exit 0
//! means healthy.

use crate::artifact::Artifact;
use crate::prefix::Prefix;
use crate::shell;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of a health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    /// Human-readable reason the artifact needs (re)installation.
    Unhealthy(String),
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Evaluates artifact health against a prefix.
pub struct HealthChecker<'a> {
    prefix: &'a Prefix,
}

impl<'a> HealthChecker<'a> {
    pub fn new(prefix: &'a Prefix) -> Self {
        Self { prefix }
    }

    /// Check one artifact. Overrides take precedence over the default rule.
    pub fn check(&self, artifact: &Artifact) -> Health {
        let health = match &artifact.health {
            Some(command) => self.check_override(artifact, command),
            None => self.check_default(artifact),
        };
        if let Health::Unhealthy(reason) = &health {
            debug!(artifact = %artifact.name, %reason, "unhealthy");
        }
        health
    }

    fn check_override(&self, artifact: &Artifact, command: &str) -> Health {
        let options = shell::CommandOptions {
            path: Some(shell::join_search_path(&self.prefix.search_path)),
            ..Default::default()
        };
        match shell::run_shell(command, &options) {
            Ok(result) if result.success => Health::Healthy,
            Ok(result) => Health::Unhealthy(format!(
                "health command for '{}' exited with {:?}",
                artifact.name, result.exit_code
            )),
            Err(err) => Health::Unhealthy(format!(
                "health command for '{}' failed to run: {err}",
                artifact.name
            )),
        }
    }

    fn check_default(&self, artifact: &Artifact) -> Health {
        let Some(resolved) = resolve_on_path(&artifact.name, &self.prefix.search_path) else {
            return Health::Unhealthy(format!("'{}' is not on the search path", artifact.name));
        };
        if !self.prefix.contains(&resolved) {
            return Health::Unhealthy(format!(
                "'{}' resolves to {} outside the managed tree",
                artifact.name,
                resolved.display()
            ));
        }
        let Some(expected) = &artifact.version else {
            return Health::Healthy;
        };

        let path_value = shell::join_search_path(&self.prefix.search_path);
        let result =
            match shell::run_binary(&resolved, &[artifact.version_flag.as_str()], Some(&path_value))
            {
                Ok(result) => result,
                Err(err) => {
                    return Health::Unhealthy(format!(
                        "invoking {} {}: {err}",
                        resolved.display(),
                        artifact.version_flag
                    ));
                }
            };
        let actual = result.stdout.trim_end_matches('\n');
        if actual == expected {
            Health::Healthy
        } else {
            Health::Unhealthy(format!(
                "'{}' version mismatch: expected '{expected}', got '{actual}'",
                artifact.name
            ))
        }
    }
}

/// Resolve a tool to the first matching executable file on the search path.
pub fn resolve_on_path(tool: &str, search_path: &[PathBuf]) -> Option<PathBuf> {
    for dir in search_path {
        let candidate = dir.join(tool);
        if candidate.is_file() && is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
