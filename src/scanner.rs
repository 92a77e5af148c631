//! Filesystem scanning under a compare-mode filter
//!
//! A scan walks one side's root and yields a [`FileRecord`] per regular file
//! that the active [`CompareMode`] admits. Filtering happens during the walk
//! (whole WIP subtrees are pruned in `Images` mode) so large capture trees
//! never have to be materialized before filtering. Each call re-walks from
//! scratch; there is no shared cursor.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::index::FileRecord;

/// Path segments that mark work-in-progress artifacts
pub const WIP_SEGMENTS: [&str; 2] = ["WBPP", "Processing"];

/// Path segment that marks flat-calibration sessions
pub const FLAT_SEGMENT: &str = "_FlatWizard";

/// Private directory under the local root (indexes, state, skip logs).
/// Anything whose name starts with this prefix is invisible to scans,
/// which also covers the remote-side index file.
pub const PRIVATE_PREFIX: &str = ".apsync";

/// Path filter applied to scans and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    /// Science data: exclude any path with a WBPP/Processing segment
    Images,
    /// Work-in-progress only: include only such paths
    Wip,
}

impl CompareMode {
    /// Whether a `/`-normalized relative path is in scope for this mode
    #[must_use]
    pub fn includes(self, rel_path: &str) -> bool {
        match self {
            Self::Images => !is_wip_path(rel_path),
            Self::Wip => is_wip_path(rel_path),
        }
    }
}

/// Frame category of a capture file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Science frames (everything outside `_FlatWizard`)
    Light,
    /// Flat-calibration frames
    Flat,
}

/// Whether any path component contains a WIP marker (case-insensitive)
#[must_use]
pub fn is_wip_path(rel_path: &str) -> bool {
    rel_path.split('/').any(|part| {
        let part = part.to_lowercase();
        WIP_SEGMENTS
            .iter()
            .any(|segment| part.contains(&segment.to_lowercase()))
    })
}

/// Frame kind of a `/`-normalized relative path
#[must_use]
pub fn frame_kind(rel_path: &str) -> FrameKind {
    if rel_path.split('/').any(|part| part == FLAT_SEGMENT) {
        FrameKind::Flat
    } else {
        FrameKind::Light
    }
}

/// Directory walker producing one side's file records
pub struct Scanner {
    mode: Option<CompareMode>,
    hash_contents: bool,
}

impl Scanner {
    /// Create a scanner for the given compare mode
    #[must_use]
    pub const fn new(mode: CompareMode) -> Self {
        Self {
            mode: Some(mode),
            hash_contents: false,
        }
    }

    /// Create a scanner that records every file regardless of mode
    ///
    /// Index rebuilds use this: the persisted indexes hold the complete
    /// tree, and compare-mode filtering happens at query time.
    #[must_use]
    pub const fn unfiltered() -> Self {
        Self {
            mode: None,
            hash_contents: false,
        }
    }

    /// Also compute a SHA-256 digest per file (strict equality mode)
    #[must_use]
    pub const fn with_digests(mut self, hash_contents: bool) -> Self {
        self.hash_contents = hash_contents;
        self
    }

    /// Walk `root` and yield records lazily
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] without yielding anything if the root is not
    /// a readable directory. Errors on individual entries surface as `Err`
    /// items; callers must discard the whole scan rather than merge a
    /// partial one.
    pub fn scan<'a>(
        &'a self,
        root: &'a Path,
    ) -> Result<impl Iterator<Item = Result<FileRecord>> + 'a> {
        let metadata = std::fs::metadata(root).map_err(|e| Error::Scan {
            root: root.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(Error::Scan {
                root: root.to_path_buf(),
                source: std::io::Error::other("not a directory"),
            });
        }

        let prune_wip = self.mode == Some(CompareMode::Images);
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if name.starts_with(PRIVATE_PREFIX) {
                    return false;
                }
                // Prune whole WIP subtrees while walking in Images mode
                if prune_wip && entry.file_type().is_dir() {
                    let lowered = name.to_lowercase();
                    if WIP_SEGMENTS
                        .iter()
                        .any(|segment| lowered.contains(&segment.to_lowercase()))
                    {
                        return false;
                    }
                }
                true
            });

        Ok(walker.filter_map(move |entry| self.record_from_entry(root, entry)))
    }

    /// Walk `root` and collect every record, aborting on the first error
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] if the root is unreachable or any entry
    /// cannot be read; no partial output is returned.
    pub fn scan_collect(&self, root: &Path) -> Result<Vec<FileRecord>> {
        let records: Vec<FileRecord> = self.scan(root)?.collect::<Result<_>>()?;
        debug!(root = %root.display(), files = records.len(), "scan complete");
        Ok(records)
    }

    fn record_from_entry(
        &self,
        root: &Path,
        entry: walkdir::Result<walkdir::DirEntry>,
    ) -> Option<Result<FileRecord>> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let source = std::io::Error::other(e);
                return Some(Err(Error::Scan {
                    root: root.to_path_buf(),
                    source,
                }));
            }
        };

        if !entry.file_type().is_file() {
            return None;
        }

        let rel_path = normalize_rel_path(entry.path().strip_prefix(root).ok()?);
        if !self.mode.is_none_or(|mode| mode.includes(&rel_path)) {
            return None;
        }

        Some(self.record_from_file(entry.path(), rel_path))
    }

    fn record_from_file(&self, path: &Path, rel_path: String) -> Result<FileRecord> {
        let metadata = std::fs::metadata(path)?;
        let digest = if self.hash_contents {
            Some(hash_file(path)?)
        } else {
            None
        };

        Ok(FileRecord {
            rel_path,
            size: metadata.len(),
            mtime: unix_mtime(metadata.modified()?),
            digest,
        })
    }
}

/// Normalize a relative path to `/` separators
#[must_use]
pub fn normalize_rel_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whole-second Unix timestamp of a modification time
#[must_use]
pub fn unix_mtime(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

/// Compute the SHA-256 digest of a file by streaming its contents
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192]; // 8KB buffer for streaming

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn create_file(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "frame data").unwrap();
    }

    fn rel_paths(records: &[FileRecord]) -> Vec<&str> {
        let mut paths: Vec<&str> = records.iter().map(|r| r.rel_path.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    #[test]
    fn test_wip_detection_is_case_insensitive() {
        assert!(is_wip_path("DATE_2026-02-12_M31/WBPP/master.xisf"));
        assert!(is_wip_path("DATE_2026-02-12_M31/wbpp_run2/master.xisf"));
        assert!(is_wip_path("Orion/processing/stretch.tif"));
        assert!(!is_wip_path("DATE_2026-02-12_M31/Light_001.fits"));
    }

    #[test]
    fn test_frame_kind() {
        assert_eq!(
            frame_kind("_FlatWizard/session1/Flat_001.fits"),
            FrameKind::Flat
        );
        assert_eq!(
            frame_kind("DATE_2026-02-12_M31/Light_001.fits"),
            FrameKind::Light
        );
    }

    #[test]
    fn test_scan_images_excludes_wip() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_001.fits");
        create_file(tmp.path(), "DATE_2026-02-12_M31/WBPP/master.xisf");

        let records = Scanner::new(CompareMode::Images)
            .scan_collect(tmp.path())
            .unwrap();

        assert_eq!(rel_paths(&records), ["DATE_2026-02-12_M31/Light_001.fits"]);
    }

    #[test]
    fn test_scan_wip_includes_only_wip() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_001.fits");
        create_file(tmp.path(), "DATE_2026-02-12_M31/WBPP/master.xisf");

        let records = Scanner::new(CompareMode::Wip)
            .scan_collect(tmp.path())
            .unwrap();

        assert_eq!(rel_paths(&records), ["DATE_2026-02-12_M31/WBPP/master.xisf"]);
    }

    #[test]
    fn test_modes_partition_the_tree() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_001.fits");
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_002.fits");
        create_file(tmp.path(), "DATE_2026-02-12_M31/WBPP/master.xisf");
        create_file(tmp.path(), "DATE_2026-03-01_Orion/Processing/final.tif");
        create_file(tmp.path(), "_FlatWizard/session1/Flat_001.fits");

        let images = Scanner::new(CompareMode::Images)
            .scan_collect(tmp.path())
            .unwrap();
        let wip = Scanner::new(CompareMode::Wip)
            .scan_collect(tmp.path())
            .unwrap();

        let mut union = rel_paths(&images);
        union.extend(rel_paths(&wip));
        union.sort_unstable();

        assert_eq!(images.len() + wip.len(), 5);
        assert_eq!(
            union,
            [
                "DATE_2026-02-12_M31/Light_001.fits",
                "DATE_2026-02-12_M31/Light_002.fits",
                "DATE_2026-02-12_M31/WBPP/master.xisf",
                "DATE_2026-03-01_Orion/Processing/final.tif",
                "_FlatWizard/session1/Flat_001.fits",
            ]
        );
        for record in &images {
            assert!(!wip.iter().any(|w| w.rel_path == record.rel_path));
        }
    }

    #[test]
    fn test_unfiltered_scan_sees_both_partitions() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_001.fits");
        create_file(tmp.path(), "DATE_2026-02-12_M31/WBPP/master.xisf");

        let records = Scanner::unfiltered().scan_collect(tmp.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_scan_skips_private_dir() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_001.fits");
        create_file(tmp.path(), ".apsync/local_index.json");
        create_file(tmp.path(), ".apsync_index.json");

        let records = Scanner::new(CompareMode::Images)
            .scan_collect(tmp.path())
            .unwrap();

        assert_eq!(rel_paths(&records), ["DATE_2026-02-12_M31/Light_001.fits"]);
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        let result = Scanner::new(CompareMode::Images).scan_collect(&missing);
        assert!(matches!(result, Err(Error::Scan { .. })));
    }

    #[test]
    fn test_scan_with_digests() {
        let tmp = TempDir::new().unwrap();
        create_file(tmp.path(), "DATE_2026-02-12_M31/Light_001.fits");

        let records = Scanner::new(CompareMode::Images)
            .with_digests(true)
            .scan_collect(tmp.path())
            .unwrap();

        let digest = records[0].digest.as_deref().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_identical_files() {
        let tmp = TempDir::new().unwrap();
        let file1 = tmp.path().join("file1.fits");
        let file2 = tmp.path().join("file2.fits");

        fs::write(&file1, "same content").unwrap();
        fs::write(&file2, "same content").unwrap();

        assert_eq!(hash_file(&file1).unwrap(), hash_file(&file2).unwrap());
    }

    #[test]
    fn test_hash_different_files() {
        let tmp = TempDir::new().unwrap();
        let file1 = tmp.path().join("file1.fits");
        let file2 = tmp.path().join("file2.fits");

        fs::write(&file1, "content 1").unwrap();
        fs::write(&file2, "content 2").unwrap();

        assert_ne!(hash_file(&file1).unwrap(), hash_file(&file2).unwrap());
    }
}
