//! Content hashing for change detection.
//!
//! The hash is computed over the raw file bytes, never over decoded text.
//! Local and remote sides must agree on the algorithm or every comparison
//! is meaningless.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported content hash algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5, the fingerprint most manifest servers publish.
    #[default]
    Md5,
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Length of the hex digest in characters.
    #[must_use]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(format!("Unknown hash algorithm: {s}")),
        }
    }
}

/// Compute the lowercase hex fingerprint of `bytes`.
///
/// # Example
///
/// ```
/// use httpsync::sync::{content_hash, HashAlgorithm};
///
/// let hash = content_hash(b"", HashAlgorithm::Md5);
/// assert_eq!(hash, "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[must_use]
pub fn content_hash(bytes: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Md5 => format!("{:x}", Md5::digest(bytes)),
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
    }
}

/// Check if a remote hash differs from the local one.
///
/// Returns `true` when there is no local hash or the hashes differ.
/// Hex digests are compared case-insensitively.
#[must_use]
pub fn has_changed(remote_hash: &str, local_hash: Option<&str>) -> bool {
    local_hash.is_none_or(|h| !h.eq_ignore_ascii_case(remote_hash))
}
