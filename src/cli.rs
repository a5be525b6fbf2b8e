//! CLI argument definitions and command dispatch.
//!
//! Arguments are defined with clap's derive macros; the main entry point
//! is the [`Cli`] struct. [`run`] dispatches to the individual commands.

use crate::error::Result;
use crate::health::{Health, HealthChecker};
use crate::manifest;
use crate::prefix::Prefix;
use crate::provision::Orchestrator;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use std::path::PathBuf;

/// Toolshed - workstation tool provisioning.
#[derive(Debug, Parser)]
#[command(name = "toolshed")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the tool manifest
    #[arg(short, long, global = true, default_value = "tools.yml")]
    pub manifest: PathBuf,

    /// Installation root (overrides TOOLSHED_ROOT)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install every unhealthy tool from the manifest (default)
    Provision,

    /// Show the health of every tool in the manifest
    Status,

    /// List the tools the manifest declares
    List,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Dispatch the parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None | Some(Commands::Provision) => provision(cli),
        Some(Commands::Status) => status(cli),
        Some(Commands::List) => list(cli),
        Some(Commands::Completions(args)) => {
            completions(args);
            Ok(())
        }
    }
}

fn load_prefix(cli: &Cli) -> Result<Prefix> {
    match &cli.root {
        Some(root) => Prefix::new(root.clone(), crate::prefix::parse_search_path()),
        None => Prefix::from_env(),
    }
}

fn provision(cli: &Cli) -> Result<()> {
    let artifacts = manifest::load(&cli.manifest)?;
    let prefix = load_prefix(cli)?;
    prefix.prepare_tmp()?;
    let outcome = Orchestrator::new().provision(&artifacts, &prefix);
    prefix.cleanup_tmp();

    let report = outcome?;
    println!(
        "{} {} installed, {} already healthy ({} total)",
        style("✓").green().bold(),
        report.installed.len(),
        report.skipped.len(),
        report.total
    );
    Ok(())
}

fn status(cli: &Cli) -> Result<()> {
    let artifacts = manifest::load(&cli.manifest)?;
    let prefix = load_prefix(cli)?;
    let checker = HealthChecker::new(&prefix);
    let mut unhealthy = 0;
    for artifact in &artifacts {
        match checker.check(artifact) {
            Health::Healthy => {
                println!("{} {}", style("✓").green(), artifact.name);
            }
            Health::Unhealthy(reason) => {
                unhealthy += 1;
                println!(
                    "{} {} {}",
                    style("✗").red(),
                    artifact.name,
                    style(format!("({reason})")).dim()
                );
            }
        }
    }
    if unhealthy > 0 {
        println!(
            "\n{} tool(s) need provisioning; run {}",
            unhealthy,
            style("toolshed provision").cyan()
        );
    }
    Ok(())
}

fn list(cli: &Cli) -> Result<()> {
    let artifacts = manifest::load(&cli.manifest)?;
    for artifact in &artifacts {
        let version = artifact.version.as_deref().unwrap_or("any");
        println!(
            "{}  {}  {}",
            style(&artifact.name).bold(),
            artifact.source.kind(),
            style(version).dim()
        );
    }
    Ok(())
}

fn completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "toolshed", &mut std::io::stdout());
}
