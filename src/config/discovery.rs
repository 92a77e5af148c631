//! Configuration file discovery from multiple locations

use std::path::{Path, PathBuf};

/// Configuration file locations in order of precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFiles {
    /// Config from CLI flag (highest precedence)
    pub cli: Option<PathBuf>,
    /// Project-level config (.apsync.toml, found walking up from cwd)
    pub project: Option<PathBuf>,
    /// Global XDG config
    pub global: Option<PathBuf>,
}

/// Config file discovery
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Create a new config discovery instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Discover all available configuration files
    ///
    /// Returns a `ConfigFiles` struct with paths to discovered configs.
    pub fn discover(cli_path: Option<&Path>) -> ConfigFiles {
        let cli = cli_path.and_then(|p| {
            if p.exists() {
                Some(p.to_path_buf())
            } else {
                None
            }
        });

        let project = Self::find_file(".apsync.toml");
        let global = Self::find_global_config();

        ConfigFiles {
            cli,
            project,
            global,
        }
    }

    /// Find a config file in the current directory or parent directories
    fn find_file(name: &str) -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let candidate = current.join(name);
            if candidate.exists() && candidate.is_file() {
                return Some(candidate);
            }

            // Move to parent directory
            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Find global config in XDG config directory
    fn find_global_config() -> Option<PathBuf> {
        let config_dir = dirs::config_dir()?;
        let global_config = config_dir.join("apsync").join("config.toml");

        if global_config.exists() && global_config.is_file() {
            Some(global_config)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_discover_cli_config() {
        let tmp = TempDir::new().unwrap();
        let cli_config = tmp.path().join("custom.toml");
        fs::write(&cli_config, "# config").unwrap();

        let files = ConfigDiscovery::discover(Some(&cli_config));

        assert_eq!(files.cli, Some(cli_config));
    }

    #[test]
    fn test_discover_cli_config_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let cli_config = tmp.path().join("nonexistent.toml");

        let files = ConfigDiscovery::discover(Some(&cli_config));

        // Nonexistent CLI config should be None (not an error)
        assert!(files.cli.is_none());
    }
}
