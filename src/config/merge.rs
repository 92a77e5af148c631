//! Configuration merging with precedence rules
//!
//! # Merging Semantics
//!
//! - **Optional fields** (server, roots, mode, tolerance): last-wins — a
//!   higher-precedence config that sets the field overrides the lower one;
//!   an unset field leaves the lower value in place.
//! - **Booleans**: OR semantics — if any config sets a flag to `true`, the
//!   result is `true`. Explicit enablement anywhere is honored.

use std::fs;
use std::path::Path;

use super::discovery::ConfigFiles;
use super::types::Config;
use crate::error::{Error, Result};

/// Configuration merger
pub struct ConfigMerger;

impl ConfigMerger {
    /// Create a new config merger
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Merge the discovered config files with precedence rules
    ///
    /// Precedence order (highest to lowest):
    /// 1. CLI config
    /// 2. Project `.apsync.toml`
    /// 3. Global config
    ///
    /// # Errors
    ///
    /// Returns an error if config files cannot be read or parsed.
    pub fn merge(files: &ConfigFiles) -> Result<Config> {
        let mut merged = Config::default();

        // Load and merge in reverse precedence order (lowest to highest)
        if let Some(global) = &files.global {
            Self::merge_into(&mut merged, global)?;
        }

        if let Some(project) = &files.project {
            Self::merge_into(&mut merged, project)?;
        }

        if let Some(cli) = &files.cli {
            Self::merge_into(&mut merged, cli)?;
        }

        Ok(merged)
    }

    /// Load and merge a single config file into the existing config
    fn merge_into(base: &mut Config, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(Error::Io)?;

        let config: Config = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if config.server.is_some() {
            base.server = config.server;
        }
        if config.username.is_some() {
            base.username = config.username;
        }
        if config.password.is_some() {
            base.password = config.password;
        }
        if config.remote_root.is_some() {
            base.remote_root = config.remote_root;
        }
        if config.local_root.is_some() {
            base.local_root = config.local_root;
        }
        if config.compare_mode.is_some() {
            base.compare_mode = config.compare_mode;
        }
        if config.mtime_tolerance_secs.is_some() {
            base.mtime_tolerance_secs = config.mtime_tolerance_secs;
        }

        // Boolean flags use OR semantics: if any config sets to true, it's true
        base.include_flats |= config.include_flats;
        base.delete_source |= config.delete_source;
        base.use_digest |= config.use_digest;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_merge_empty_config() {
        let files = ConfigFiles {
            cli: None,
            project: None,
            global: None,
        };

        let config = ConfigMerger::merge(&files).unwrap();

        assert!(config.server.is_none());
        assert!(!config.include_flats);
    }

    #[test]
    fn test_merge_single_config() {
        let tmp = TempDir::new().unwrap();
        let config_file = tmp.path().join("config.toml");
        fs::write(
            &config_file,
            r#"
server = "nasbox"
local_root = "/data/NINA"
include_flats = true
"#,
        )
        .unwrap();

        let files = ConfigFiles {
            cli: Some(config_file),
            project: None,
            global: None,
        };

        let config = ConfigMerger::merge(&files).unwrap();
        assert_eq!(config.server.as_deref(), Some("nasbox"));
        assert!(config.include_flats);
    }

    #[test]
    fn test_merge_precedence() {
        let tmp = TempDir::new().unwrap();

        let global = tmp.path().join("global.toml");
        fs::write(&global, "server = \"oldbox\"\nmtime_tolerance_secs = 2\n").unwrap();

        let cli = tmp.path().join("cli.toml");
        fs::write(&cli, "server = \"nasbox\"\n").unwrap();

        let files = ConfigFiles {
            cli: Some(cli),
            project: None,
            global: Some(global),
        };

        let config = ConfigMerger::merge(&files).unwrap();

        // CLI config overrides the server, but the unset tolerance survives
        assert_eq!(config.server.as_deref(), Some("nasbox"));
        assert_eq!(config.mtime_tolerance_secs, Some(2));
    }

    #[test]
    fn test_merge_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.toml");
        fs::write(&bad, "server = [not toml").unwrap();

        let files = ConfigFiles {
            cli: Some(bad),
            project: None,
            global: None,
        };

        assert!(ConfigMerger::merge(&files).is_err());
    }
}
