//! skillshare - project a skills directory into AI tool targets
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! # Overview
//!
//! Skillshare keeps a single source-of-truth directory of skills (each a
//! folder with a `SKILL.md`) and projects them into the directories that
//! external AI/editor tools read, in one of three modes: a whole-directory
//! symlink, per-skill links (merge), or per-skill copies.
//!
//! # Directory layout
//!
//! ```text
//! $XDG_CONFIG_HOME/skillshare/config.yaml   # source + targets
//! $XDG_CACHE_HOME/skillshare/               # discovery caches
//! $XDG_DATA_HOME/skillshare/backups/        # target snapshots
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "skillshare")]
#[command(author, version, about = "Sync a skills directory into AI tool targets")]
pub struct Cli {
    /// Config file path (defaults to the XDG location)
    #[arg(long, global = true, env = "SKILLSHARE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a starter config file
    Init {
        /// Source-of-truth skills directory
        source: PathBuf,
    },
    /// Project skills into every configured target
    Sync {
        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,
        /// Replace user-local entries and external links
        #[arg(short, long)]
        force: bool,
        /// Sync only this target
        #[arg(long)]
        target: Option<String>,
    },
    /// Show per-target state
    Status,
    /// Preview the next sync without mutating anything
    Diff,
    /// Find skills that exist only in targets and pull them into source
    Collect {
        /// Apply the pull (default is preview only)
        #[arg(long)]
        apply: bool,
        /// Overwrite source skills that already exist
        #[arg(short, long)]
        force: bool,
        /// Collect from this target only
        #[arg(long)]
        target: Option<String>,
    },
    /// Backup management
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Restore a backup snapshot over a target
    Restore {
        /// Snapshot timestamp (YYYY-MM-DD_HH-MM-SS)
        backup: String,
        /// Target name within the snapshot
        target: String,
        /// Restore even over a non-empty directory
        #[arg(short, long)]
        force: bool,
    },
    /// Target configuration
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Show the effective configuration
    Config {
        /// Print the config file path instead of its contents
        #[arg(long)]
        path: bool,
    },
    /// Discovery cache inspection
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Run the localhost HTTP control plane
    Serve {
        /// Port to bind on 127.0.0.1
        #[arg(long, default_value_t = 7337)]
        port: u16,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum BackupCommands {
    /// Snapshot targets now
    Create {
        /// Only this target
        #[arg(long)]
        target: Option<String>,
    },
    /// List snapshots, newest first
    List,
    /// Delete all but the newest N snapshots
    Cleanup {
        /// Snapshots to keep
        #[arg(long, default_value_t = 5)]
        keep: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum TargetCommands {
    /// Add a target
    Add {
        /// Target name
        name: String,
        /// Directory to project into
        path: PathBuf,
        /// Projection mode (symlink | merge | copy); inherits the default otherwise
        #[arg(long)]
        mode: Option<String>,
    },
    /// Remove a target
    Remove {
        /// Target name
        name: String,
    },
    /// List configured targets
    List,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Show on-disk discovery caches
    Info,
    /// Remove every discovery cache
    Clear,
}

/// Resolves the config path: flag/env override, then the XDG default.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(skillshare_core::config_path)
}
