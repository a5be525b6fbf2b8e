//! Provisioning orchestration.
//!
//! One run moves through four phases:
//!
//! 1. **filter** — artifacts whose health check passes are skipped
//!    entirely; no download, no install attempt.
//! 2. **dispatch** — custom install procedures run strictly sequentially
//!    (they may share external package-manager state), in manifest order,
//!    which is lexicographic by name. Download artifacts fan out onto one
//!    thread each, every thread bounded by a per-artifact deadline nested
//!    inside the overall one.
//! 3. **join** — wait for every thread.
//! 4. **verify** — every originally-unhealthy artifact is re-checked; any
//!    artifact still unhealthy fails the whole run. A quiet exit after a
//!    half-finished install would be worse than a loud one.
//!
//! Per-artifact failures are isolated: a thread logs its error and ends,
//! and only the final verify phase can fail the run.

use crate::artifact::{Artifact, InstallSource};
use crate::deadline::Deadline;
use crate::error::{Result, ToolshedError};
use crate::fetch::Fetcher;
use crate::health::{self, Health, HealthChecker};
use crate::install::Installer;
use crate::prefix::Prefix;
use crate::shell;
use std::collections::HashMap;
use std::fs;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// Budget for the whole installation phase.
pub const OVERALL_DEADLINE: Duration = Duration::from_secs(600);
/// Budget for a single download artifact, nested inside the overall one
/// so one stuck artifact cannot starve the rest.
pub const PER_ARTIFACT_DEADLINE: Duration = Duration::from_secs(300);

/// Summary of one provisioning run.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    /// Artifacts that were unhealthy and are now healthy.
    pub installed: Vec<String>,
    /// Artifacts skipped because they were already healthy.
    pub skipped: Vec<String>,
    /// Total artifacts considered.
    pub total: usize,
}

/// Drives the acquisition-and-installation pipeline.
pub struct Orchestrator {
    overall: Duration,
    per_artifact: Duration,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            overall: OVERALL_DEADLINE,
            per_artifact: PER_ARTIFACT_DEADLINE,
        }
    }

    /// Override the deadlines. Tests use short ones.
    pub fn with_deadlines(overall: Duration, per_artifact: Duration) -> Self {
        Self {
            overall,
            per_artifact,
        }
    }

    /// Run the pipeline over `artifacts` (already name-sorted by the
    /// manifest loader).
    pub fn provision(&self, artifacts: &[Artifact], prefix: &Prefix) -> Result<ProvisionReport> {
        check_host_prerequisites(prefix)?;

        let checker = HealthChecker::new(prefix);
        let mut report = ProvisionReport {
            total: artifacts.len(),
            ..Default::default()
        };

        // Phase 1: filter.
        let mut pending = Vec::new();
        for artifact in artifacts {
            match checker.check(artifact) {
                Health::Healthy => report.skipped.push(artifact.name.clone()),
                Health::Unhealthy(reason) => {
                    info!(artifact = %artifact.name, %reason, "needs installation");
                    pending.push(artifact);
                }
            }
        }

        // Phase 2: dispatch. Custom procedures first, one at a time.
        let (customs, downloads): (Vec<&Artifact>, Vec<&Artifact>) = pending
            .iter()
            .copied()
            .partition(|artifact| !artifact.is_download());
        for artifact in &customs {
            self.run_custom(artifact, prefix);
        }

        let deadline = Deadline::after(self.overall);
        let fetcher = Fetcher::new();
        let installer = Installer::new(prefix);
        thread::scope(|scope| {
            for artifact in &downloads {
                let fetcher = &fetcher;
                let installer = &installer;
                scope.spawn(move || {
                    self.run_download(artifact, prefix, fetcher, installer, deadline)
                });
            }
            // Phase 3: join happens when the scope closes.
        });

        // Phase 4: verify. Still-unhealthy artifacts are a run-level
        // invariant violation, not a recoverable per-artifact failure.
        let mut still_unhealthy = Vec::new();
        for artifact in &pending {
            match checker.check(artifact) {
                Health::Healthy => report.installed.push(artifact.name.clone()),
                Health::Unhealthy(reason) => {
                    error!(artifact = %artifact.name, %reason, "still unhealthy after provisioning");
                    still_unhealthy.push(artifact.name.clone());
                }
            }
        }

        info!(
            installed = report.installed.len(),
            skipped = report.skipped.len(),
            total = report.total,
            "provisioning finished"
        );
        if still_unhealthy.is_empty() {
            Ok(report)
        } else {
            Err(ToolshedError::ProvisionIncomplete {
                names: still_unhealthy,
            })
        }
    }

    /// Run one custom install procedure to completion. Failures are
    /// logged and isolated; the verify phase will catch the fallout.
    fn run_custom(&self, artifact: &Artifact, prefix: &Prefix) {
        let InstallSource::Custom { commands } = &artifact.source else {
            return;
        };
        info!(artifact = %artifact.name, "running custom install");
        let options = shell::CommandOptions {
            env: prefix_env(prefix),
            path: Some(shell::join_search_path(&prefix.search_path)),
            inherit_stdio: true,
            ..Default::default()
        };
        for command in commands {
            match shell::run_shell(command, &options) {
                Ok(result) if result.success => {}
                Ok(result) => {
                    error!(
                        artifact = %artifact.name,
                        %command,
                        exit_code = ?result.exit_code,
                        "custom install command failed"
                    );
                    return;
                }
                Err(err) => {
                    error!(
                        artifact = %artifact.name,
                        %command,
                        error = %err,
                        "custom install command could not be run"
                    );
                    return;
                }
            }
        }
    }

    /// One artifact's download → extract → locate → install pipeline,
    /// run on its own thread under its own deadline.
    fn run_download(
        &self,
        artifact: &Artifact,
        prefix: &Prefix,
        fetcher: &Fetcher,
        installer: &Installer<'_>,
        overall: Deadline,
    ) {
        let InstallSource::DirectDownload { url, sha256 } = &artifact.source else {
            return;
        };
        let workdir = prefix.workdir(&artifact.name);
        if let Err(err) = fs::create_dir_all(&workdir) {
            error!(
                artifact = %artifact.name,
                dir = %workdir.display(),
                error = %err,
                "creating working directory"
            );
            return;
        }

        let unit_deadline = overall.nested(self.per_artifact);
        let Some(archive) = fetcher.fetch(&artifact.name, url, sha256, &workdir, unit_deadline)
        else {
            error!(artifact = %artifact.name, %url, "download did not complete before deadline");
            return;
        };
        if let Err(err) = installer.install(artifact, &archive) {
            error!(artifact = %artifact.name, error = %err, "installation failed");
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment exported to custom install procedures.
fn prefix_env(prefix: &Prefix) -> HashMap<String, String> {
    HashMap::from([
        ("TOOLSHED_ROOT".into(), prefix.root.display().to_string()),
        ("TOOLSHED_BIN".into(), prefix.bin.display().to_string()),
        ("TOOLSHED_SHARE".into(), prefix.share.display().to_string()),
        ("TOOLSHED_TMP".into(), prefix.tmp.display().to_string()),
    ])
}

/// The pipeline itself shells out through `sh` (custom installs, health
/// overrides, version probes); fail early with a clear message if it is
/// not reachable.
fn check_host_prerequisites(prefix: &Prefix) -> Result<()> {
    if health::resolve_on_path("sh", &prefix.search_path).is_none() {
        return Err(ToolshedError::PrerequisiteMissing {
            tool: "sh".into(),
            message: "custom install procedures and health probes run through sh".into(),
        });
    }
    Ok(())
}
