//! Configuration management.
//!
//! Settings for a sync run come from four layers, highest priority first:
//!
//! 1. Command-line flags
//! 2. `HTTPSYNC_*` environment variables (read by clap alongside the flags)
//! 3. The JSON config file (`--config` or `~/.httpsync/config.json`)
//! 4. Built-in defaults
//!
//! # Config File
//!
//! ```json
//! {
//!   "url": "http://127.0.0.1:8080/",
//!   "root": "/srv/mirror",
//!   "manifest_path": "md5",
//!   "algorithm": "md5",
//!   "timeout_secs": 30,
//!   "strict": false
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sync::{FailurePolicy, HashAlgorithm, SyncOptions, DEFAULT_MANIFEST_PATH, DEFAULT_TIMEOUT};

/// Contents of the JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub manifest_path: Option<String>,
    pub root: Option<PathBuf>,
    pub algorithm: Option<HashAlgorithm>,
    pub timeout_secs: Option<u64>,
    pub strict: Option<bool>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct SyncOverrides {
    pub url: Option<String>,
    pub manifest_path: Option<String>,
    pub root: Option<PathBuf>,
    pub algorithm: Option<HashAlgorithm>,
    pub timeout_secs: Option<u64>,
    pub strict: bool,
    pub dry_run: bool,
}

/// Default config file location: `~/.httpsync/config.json`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".httpsync").join("config.json"))
}

/// Load the config file.
///
/// An explicit path must exist. The default path is optional; when it is
/// missing the empty config is returned.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or parsed.
pub fn load_config(explicit_path: Option<&Path>) -> Result<ConfigFile> {
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(ConfigFile::default()),
        },
    };

    debug!(path = %path.display(), "Loading config file");
    let content = fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })
}

/// Merge command-line values over the config file into engine options.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if no URL or root is configured, the
/// URL is not HTTP(S), or the timeout is zero.
pub fn resolve_options(overrides: &SyncOverrides, file: &ConfigFile) -> Result<SyncOptions> {
    let url = overrides
        .url
        .clone()
        .or_else(|| file.url.clone())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::InvalidArgument("No server URL configured".to_string()))?;

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::InvalidArgument(format!(
            "URL must start with http:// or https://: {url}"
        )));
    }

    let root = overrides
        .root
        .clone()
        .or_else(|| file.root.clone())
        .ok_or_else(|| {
            Error::InvalidArgument("No sync root configured (use --root or HTTPSYNC_ROOT)".to_string())
        })?;

    let manifest_path = overrides
        .manifest_path
        .clone()
        .or_else(|| file.manifest_path.clone())
        .unwrap_or_else(|| DEFAULT_MANIFEST_PATH.to_string());

    let algorithm = overrides
        .algorithm
        .or(file.algorithm)
        .unwrap_or_default();

    let timeout = match overrides.timeout_secs.or(file.timeout_secs) {
        Some(0) => {
            return Err(Error::InvalidArgument("Timeout must be at least 1 second".to_string()));
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_TIMEOUT,
    };

    let policy = if overrides.strict || file.strict.unwrap_or(false) {
        FailurePolicy::Strict
    } else {
        FailurePolicy::BestEffort
    };

    Ok(SyncOptions::new(url, root)
        .with_manifest_path(manifest_path)
        .with_algorithm(algorithm)
        .with_timeout(timeout)
        .with_policy(policy)
        .with_dry_run(overrides.dry_run))
}
