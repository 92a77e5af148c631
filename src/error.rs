//! Error types shared across the library
//!
//! Queue misuse and scan failures are rejected synchronously with no state
//! change; transfer failures stay file-granular and are recorded rather than
//! propagated. Nothing here is fatal to the process.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the core library
#[derive(Debug, Error)]
pub enum Error {
    /// A scan root could not be walked; the scan is aborted and any prior
    /// index is left untouched.
    #[error("cannot scan {root}: {source}")]
    Scan {
        /// Root directory that could not be walked
        root: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A persisted index could not be read back; callers must force a full
    /// rebuild instead of trusting partial data.
    #[error("index file {path} is unreadable ({reason}); a full rebuild is required")]
    IndexCorruption {
        /// Path of the unreadable index file
        path: PathBuf,
        /// Decode failure description
        reason: String,
    },

    /// A configuration file could not be parsed.
    #[error("config file {path} is invalid: {reason}")]
    Config {
        /// Path of the offending config file
        path: PathBuf,
        /// Parse failure description
        reason: String,
    },

    /// The target already has a queue item among Pending/Running entries.
    #[error("target '{0}' is already queued")]
    DuplicateTarget(String),

    /// The target has no queue item.
    #[error("target '{0}' is not queued")]
    NotQueued(String),

    /// The queue item is not in a state that allows the requested change.
    #[error("queue item for '{0}' is {1} and cannot be modified")]
    InvalidState(String, &'static str),

    /// A single file transfer failed. Recorded in the skip log; execution
    /// continues with the next file.
    #[error("transfer failed for {path}: {source}")]
    Transfer {
        /// Relative path of the file that failed
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A trash action was requested without a recorded pull checkpoint.
    #[error("no successful pull recorded for '{0}'; use force to trash anyway")]
    MissingCheckpoint(String),

    /// Execution was cancelled at a file boundary; the current item keeps
    /// the counters it earned so far.
    #[error("execution cancelled")]
    Cancelled,

    /// Any other I/O failure (state files, skip logs).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_target() {
        let err = Error::DuplicateTarget("DATE_2026-02-12_M31".to_string());
        assert!(err.to_string().contains("DATE_2026-02-12_M31"));

        let err = Error::InvalidState("DATE_2026-02-12_M31".to_string(), "running");
        assert!(err.to_string().contains("running"));
    }

    #[test]
    fn test_transfer_error_keeps_source() {
        let err = Error::Transfer {
            path: "DATE_2026-02-12_M31/Light_001.fits".to_string(),
            source: std::io::Error::other("share went away"),
        };
        assert!(err.to_string().contains("Light_001.fits"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
