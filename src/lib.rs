//! Toolshed - workstation tool provisioning.
//!
//! Toolshed reads a declarative YAML manifest of command-line tools,
//! checks which of them are already present and healthy, and installs
//! the rest into a self-contained prefix: archives are downloaded,
//! checksum-verified, extracted, and the contained binary is placed on
//! the search path.
//!
//! # Modules
//!
//! - [`archive`] - Archive extraction (tar.gz, tar.xz, zip)
//! - [`artifact`] - The artifact model shared across the pipeline
//! - [`checksum`] - SHA-256 file digests
//! - [`cli`] - Command-line interface and dispatch
//! - [`deadline`] - Wall-clock deadlines for bounding the run
//! - [`error`] - Error types and result alias
//! - [`fetch`] - Retrying HTTP downloads
//! - [`health`] - Per-tool health checks
//! - [`install`] - Placement of extracted binaries into the prefix
//! - [`locate`] - Breadth-first binary search in extracted trees
//! - [`manifest`] - Manifest loading and validation
//! - [`prefix`] - The managed installation tree
//! - [`provision`] - The orchestrator tying the phases together
//! - [`shell`] - Shell command execution
//!
//! # Example
//!
//! ```
//! use toolshed::manifest;
//!
//! let artifacts = manifest::parse(
//!     "tools:\n  rg:\n    install:\n      - cargo install ripgrep\n",
//! )
//! .unwrap();
//! assert_eq!(artifacts[0].name, "rg");
//! ```

pub mod archive;
pub mod artifact;
pub mod checksum;
pub mod cli;
pub mod deadline;
pub mod error;
pub mod fetch;
pub mod health;
pub mod install;
pub mod locate;
pub mod manifest;
pub mod prefix;
pub mod provision;
pub mod shell;

pub use error::{Result, ToolshedError};
