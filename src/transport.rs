//! Byte-transfer collaborator boundary
//!
//! The executor never touches remote bytes directly; it delegates to a
//! [`Transport`]. Every failure is file-granular: the executor records it
//! and moves on, and the only retry is a fresh enqueue of the target.
//!
//! [`FsTransport`] is the default implementation over a mounted share.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Byte-level operations against the remote side
pub trait Transport {
    /// Copy one file, creating parent directories and preserving the
    /// source's modification time on the destination
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transfer`] on any failure.
    fn copy(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Move a remote file into the trash namespace instead of erasing it
    ///
    /// Both paths are relative to the remote root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transfer`] on any failure.
    fn move_to_trash(&self, remote_rel: &str, trash_rel: &str) -> Result<()>;

    /// Cheap reachability probe for the remote root
    ///
    /// # Errors
    ///
    /// Returns an error if the remote side cannot be reached at all; the
    /// executor fails the current item and moves on.
    fn check_connectivity(&self) -> Result<()>;
}

/// Filesystem transport over a mounted share
pub struct FsTransport {
    remote_root: PathBuf,
}

impl FsTransport {
    /// Transport rooted at the mounted remote path
    #[must_use]
    pub fn new(remote_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: remote_root.into(),
        }
    }

    fn transfer_error(path: &Path, source: std::io::Error) -> Error {
        Error::Transfer {
            path: path.display().to_string(),
            source,
        }
    }
}

impl Transport for FsTransport {
    fn copy(&self, source: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::transfer_error(dest, e))?;
        }

        fs::copy(source, dest).map_err(|e| Self::transfer_error(dest, e))?;

        // Carry the source mtime so metadata equality holds after the copy
        let modified = fs::metadata(source)
            .and_then(|m| m.modified())
            .map_err(|e| Self::transfer_error(source, e))?;
        fs::File::options()
            .write(true)
            .open(dest)
            .and_then(|f| f.set_modified(modified))
            .map_err(|e| Self::transfer_error(dest, e))?;

        Ok(())
    }

    fn move_to_trash(&self, remote_rel: &str, trash_rel: &str) -> Result<()> {
        let source = self.remote_root.join(remote_rel);
        let dest = self.remote_root.join(trash_rel);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::transfer_error(&dest, e))?;
        }
        fs::rename(&source, &dest).map_err(|e| Self::transfer_error(&source, e))?;
        Ok(())
    }

    fn check_connectivity(&self) -> Result<()> {
        fs::read_dir(&self.remote_root)
            .map_err(|e| Self::transfer_error(&self.remote_root, e))?;
        Ok(())
    }
}
