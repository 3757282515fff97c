//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SyncOverrides;
use crate::sync::HashAlgorithm;

pub mod commands;

/// httpsync - mirror a directory published over HTTP
#[derive(Parser, Debug)]
#[command(name = "httpsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.httpsync/config.json)
    #[arg(long, global = true, env = "HTTPSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring a local directory in line with the remote manifest
    Sync(SyncArgs),

    /// Write the manifest for a directory that is about to be published
    Manifest(ManifestArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Base URL the manifest and files are served under
    #[arg(long, env = "HTTPSYNC_URL")]
    pub url: Option<String>,

    /// Local directory to sync into
    #[arg(long, env = "HTTPSYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// Manifest path relative to the URL (default: md5)
    #[arg(long, env = "HTTPSYNC_MANIFEST")]
    pub manifest_path: Option<String>,

    /// Hash algorithm the manifest uses (default: md5)
    #[arg(long, value_enum, env = "HTTPSYNC_ALGORITHM")]
    pub algorithm: Option<HashAlgorithm>,

    /// Seconds to wait on the server before giving up; downloads fail only after this long without data (default: 30)
    #[arg(long, env = "HTTPSYNC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Fail the run if any single file fails
    #[arg(long)]
    pub strict: bool,

    /// Show what would be downloaded without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Flag and environment values, for merging over the config file.
    #[must_use]
    pub fn overrides(&self) -> SyncOverrides {
        SyncOverrides {
            url: self.url.clone(),
            manifest_path: self.manifest_path.clone(),
            root: self.root.clone(),
            algorithm: self.algorithm,
            timeout_secs: self.timeout,
            strict: self.strict,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Directory to describe
    pub dir: PathBuf,

    /// Write the manifest to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hash algorithm to fingerprint files with
    #[arg(long, value_enum, default_value_t)]
    pub algorithm: HashAlgorithm,
}
