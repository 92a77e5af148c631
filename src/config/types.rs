//! Configuration types and structures

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::comparison::EqualityPolicy;
use crate::scanner::CompareMode;

/// Main configuration structure
///
/// Every field is optional or defaulted so partial config files merge
/// cleanly; [`Config::compare_mode`] and friends resolve the defaults.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// NAS hostname, e.g. `nasbox`
    pub server: Option<String>,

    /// Account used to reach the share
    pub username: Option<String>,

    /// Share password; never logged, redacted from Debug output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Mounted path of the NAS backup root
    pub remote_root: Option<PathBuf>,

    /// Local capture root, e.g. `~/Pictures/NINA`
    pub local_root: Option<PathBuf>,

    /// Path filter for scans and comparisons
    pub compare_mode: Option<CompareMode>,

    /// Pull matching `_FlatWizard` sessions alongside a target
    pub include_flats: bool,

    /// Allow collaborators to delete local sources after a clean push
    /// (the core itself never deletes local files)
    pub delete_source: bool,

    /// Modified-time tolerance for metadata equality, in seconds
    pub mtime_tolerance_secs: Option<i64>,

    /// Compute SHA-256 digests during scans; digest equality then
    /// supersedes metadata equality
    pub use_digest: bool,
}

impl Config {
    /// Active compare mode, defaulting to science images
    #[must_use]
    pub fn compare_mode(&self) -> CompareMode {
        self.compare_mode.unwrap_or(CompareMode::Images)
    }

    /// Equality policy derived from the configured tolerance
    #[must_use]
    pub fn equality_policy(&self) -> EqualityPolicy {
        EqualityPolicy {
            mtime_tolerance_secs: self.mtime_tolerance_secs.unwrap_or(0),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remote_root", &self.remote_root)
            .field("local_root", &self.local_root)
            .field("compare_mode", &self.compare_mode)
            .field("include_flats", &self.include_flats)
            .field("delete_source", &self.delete_source)
            .field("mtime_tolerance_secs", &self.mtime_tolerance_secs)
            .field("use_digest", &self.use_digest)
            .finish()
    }
}
