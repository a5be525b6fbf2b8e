//! Error types for toolshed operations.
//!
//! This module defines [`ToolshedError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `ToolshedError` for per-artifact and run-level errors that need
//!   distinct handling
//! - Use `anyhow::Error` (via `ToolshedError::Other`) for attempt-scoped
//!   errors that are retried rather than surfaced
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for toolshed operations.
#[derive(Debug, Error)]
pub enum ToolshedError {
    /// Manifest file not found at expected location.
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Failed to parse the manifest file.
    #[error("Failed to parse manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// Invalid manifest structure or values.
    #[error("Invalid manifest: {message}")]
    ManifestValidation { message: String },

    /// The managed prefix is missing or malformed.
    #[error("Invalid prefix: {message}")]
    PrefixInvalid { message: String },

    /// A host tool the pipeline itself needs is missing.
    #[error("Missing prerequisite '{tool}': {message}")]
    PrerequisiteMissing { tool: String, message: String },

    /// Archive suffix is not one of the supported formats.
    #[error("Unsupported archive format: {path}")]
    UnsupportedArchive { path: PathBuf },

    /// No file matching the artifact name exists in the extracted tree.
    #[error("Binary '{name}' not found under {root}")]
    BinaryNotFound { name: String, root: PathBuf },

    /// A retained installation's binary directory is not on the search path.
    #[error(
        "'{name}' installed to {dir}, but that directory is not on the search path. \
         Add it to PATH and re-run."
    )]
    DirNotOnSearchPath { name: String, dir: PathBuf },

    /// Filesystem placement failed while finalizing an installation.
    #[error("Installing '{name}' ({from} -> {to}): {source}")]
    Placement {
        name: String,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Shell command failed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Artifacts still unhealthy after the install phase completed.
    ///
    /// This is a run-level invariant violation, not a per-artifact failure.
    #[error("Provisioning finished but these artifacts are still unhealthy: {}", names.join(", "))]
    ProvisionIncomplete { names: Vec<String> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for toolshed operations.
pub type Result<T> = std::result::Result<T, ToolshedError>;
