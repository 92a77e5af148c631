//! Operator configuration: connection details, roots, and compare policy
//!
//! This module handles:
//! - Config file discovery from multiple locations
//! - TOML parsing with serde
//! - Config merging with precedence rules
//!
//! The core consumes the merged configuration read-only. Credentials are
//! carried for the launcher's benefit and are redacted from every `Debug`
//! rendering so they cannot leak into logs.

mod discovery;
mod merge;
mod types;

pub use discovery::ConfigDiscovery;
pub use merge::ConfigMerger;
pub use types::Config;

use std::path::Path;

use crate::error::Result;

/// Load and merge configuration from all discovered sources
///
/// # Errors
///
/// Returns an error if a discovered config file cannot be read or parsed.
pub fn load(cli_config_path: Option<&Path>) -> Result<Config> {
    let files = ConfigDiscovery::discover(cli_config_path);
    ConfigMerger::merge(&files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("apsync.toml");
        fs::write(&path, "server = \"nasbox\"\ninclude_flats = true\n").unwrap();

        let config = super::load(Some(&path)).unwrap();
        assert_eq!(config.server.as_deref(), Some("nasbox"));
        assert!(config.include_flats);
    }
}
