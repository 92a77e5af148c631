//! Per-item skip logs with reason codes
//!
//! Every file skipped or errored during an item's execution lands in one
//! append-only log file under the local root's private directory, one line
//! per file with a timestamp, context label, and reason code. The operator
//! opens these on demand; the executor keeps running whether or not a log
//! line could be written.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;
use crate::scanner::PRIVATE_PREFIX;

/// Why a file was not copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Destination already holds an equal copy
    AlreadyPresent,
    /// The transport failed for this file
    TransferError,
    /// Source metadata could not be read
    Unreadable,
}

impl SkipReason {
    /// Stable code written to the log line
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyPresent => "ALREADY-PRESENT",
            Self::TransferError => "TRANSFER-ERROR",
            Self::Unreadable => "UNREADABLE",
        }
    }
}

/// Append-only writer for one item's skip log
pub struct SkipLogger {
    path: PathBuf,
    file: File,
}

impl SkipLogger {
    /// Create the log file for one queue item, with a header
    ///
    /// Logs live under `<local_root>/.apsync/logs/`, named after the
    /// sanitized target and a creation timestamp so repeated runs never
    /// collide.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory or file cannot be created.
    pub fn create(local_root: &Path, target: &str) -> Result<Self> {
        let dir = local_root.join(PRIVATE_PREFIX).join("logs");
        std::fs::create_dir_all(&dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("skip_{}_{stamp}.log", sanitize_target(target)));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "Skip log for target: {target}")?;
        writeln!(file, "Generated: {}", Local::now().to_rfc3339())?;
        writeln!(file)?;

        Ok(Self { path, file })
    }

    /// Path of the log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it to disk
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be written; callers log and
    /// continue rather than failing the item.
    pub fn log(&mut self, context: &str, reason: SkipReason, rel_path: &str) -> Result<()> {
        writeln!(
            self.file,
            "{} [{}] {}: {}",
            Local::now().to_rfc3339(),
            context,
            reason.code(),
            rel_path
        )?;
        self.file.flush()?;
        Ok(())
    }
}

/// Restrict a target name to filesystem-safe characters
fn sanitize_target(target: &str) -> String {
    let sanitized: String = target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "target".to_string()
    } else {
        trimmed.to_string()
    }
}
