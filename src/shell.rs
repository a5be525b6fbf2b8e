//! Shell command execution.
//!
//! Custom install procedures and version probes both go through here so
//! every spawned process sees the same controlled environment: the
//! prefix's search-path snapshot as `PATH`, plus whatever extra variables
//! the caller exports.

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Captured standard output (empty when stdio was inherited).
    pub stdout: String,

    /// Captured standard error (empty when stdio was inherited).
    pub stderr: String,

    /// Whether the command exited with status 0.
    pub success: bool,
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged over the parent environment).
    pub env: HashMap<String, String>,

    /// Replacement `PATH` value. `None` keeps the parent's.
    pub path: Option<String>,

    /// Stream output to the parent's stdio instead of capturing it.
    /// Custom install procedures want this; probes don't.
    pub inherit_stdio: bool,
}

/// Run `command` through `sh -c`.
pub fn run_shell(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    apply(&mut cmd, options);
    execute(cmd, options.inherit_stdio)
}

/// Run a binary directly with the given arguments, capturing output.
pub fn run_binary(program: &Path, args: &[&str], path: Option<&str>) -> Result<CommandResult> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(path) = path {
        cmd.env("PATH", path);
    }
    execute(cmd, false)
}

fn apply(cmd: &mut Command, options: &CommandOptions) {
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }
    if let Some(path) = &options.path {
        cmd.env("PATH", path);
    }
}

fn execute(mut cmd: Command, inherit_stdio: bool) -> Result<CommandResult> {
    if inherit_stdio {
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(CommandResult {
            exit_code: status.code(),
            stdout: String::new(),
            stderr: String::new(),
            success: status.success(),
        })
    } else {
        let output = cmd.stdin(Stdio::null()).output()?;
        Ok(CommandResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

/// Join search-path entries into a `PATH` value.
pub fn join_search_path(entries: &[PathBuf]) -> String {
    std::env::join_paths(entries)
        .map(|joined| joined.to_string_lossy().into_owned())
        .unwrap_or_default()
}
