//! Persisted per-side file indexes
//!
//! Each side (local, remote) keeps one index file mapping a `/`-normalized
//! relative path to the metadata observed for it. The in-memory view is an
//! immutable snapshot behind a copy-on-write swap: readers clone an `Arc`
//! and keep comparing against the last-committed snapshot while a rebuild
//! replaces the file and swaps the pointer. A failed rebuild leaves both the
//! prior file and the prior snapshot intact.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// One observed file on one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// `/`-normalized path relative to the side's root
    pub rel_path: String,
    /// File size in bytes
    pub size: u64,
    /// Modification time as a whole-second Unix timestamp
    pub mtime: i64,
    /// Optional SHA-256 content digest (strict equality mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl FileRecord {
    /// Target this record belongs to: the first path segment
    #[must_use]
    pub fn target(&self) -> &str {
        self.rel_path.split('/').next().unwrap_or(&self.rel_path)
    }
}

/// Immutable view of one side's index at a point in time
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    built_at: i64,
    records: BTreeMap<String, FileRecord>,
}

impl IndexSnapshot {
    /// Build a snapshot from scan output; later duplicates win
    #[must_use]
    pub fn from_records(records: Vec<FileRecord>, built_at: i64) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.rel_path.clone(), r))
            .collect();
        Self { built_at, records }
    }

    /// When this snapshot was last fully rebuilt
    #[must_use]
    pub const fn built_at(&self) -> i64 {
        self.built_at
    }

    /// Point lookup by relative path
    #[must_use]
    pub fn get(&self, rel_path: &str) -> Option<&FileRecord> {
        self.records.get(rel_path)
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in path order
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Records whose path falls under a target's namespace
    pub fn records_under<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a FileRecord> {
        self.records
            .range(target.to_string()..)
            .take_while(move |(key, _)| key.starts_with(target))
            .filter(move |(key, _)| {
                key.len() == target.len() || key.as_bytes()[target.len()] == b'/'
            })
            .map(|(_, record)| record)
    }

    /// Distinct target names present in this snapshot
    #[must_use]
    pub fn targets(&self) -> BTreeSet<String> {
        self.records
            .values()
            .map(|r| r.target().to_string())
            .collect()
    }
}

/// Serialized form of an index file: unique rows keyed by relative path
#[derive(Serialize, Deserialize)]
struct IndexFile {
    built_at: i64,
    rows: Vec<FileRecord>,
}

/// One side's persisted index with a copy-on-write in-memory handle
pub struct IndexStore {
    path: PathBuf,
    current: RwLock<Arc<IndexSnapshot>>,
}

impl IndexStore {
    /// Open a store, loading the persisted snapshot if one exists
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexCorruption`] if an existing index file cannot
    /// be decoded; the caller must force a full rebuild rather than trust
    /// partial data.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            Self::read_snapshot(&path)?
        } else {
            IndexSnapshot::default()
        };

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Open a store discarding any existing file content (post-corruption)
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
        }
    }

    /// Path of the persisted index file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last-committed snapshot; never blocks on a concurrent rebuild
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Replace the entire index atomically
    ///
    /// The new snapshot is serialized to a sibling temp file and renamed
    /// over the old one, then the in-memory pointer is swapped. Readers see
    /// either the old or the new complete index, never a mix; a failure
    /// before the rename leaves the prior index intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn rebuild(&self, records: Vec<FileRecord>) -> Result<()> {
        let snapshot = IndexSnapshot::from_records(records, chrono::Utc::now().timestamp());
        self.commit(snapshot)
    }

    /// Insert or replace records after successful transfers
    ///
    /// # Errors
    ///
    /// Returns an error if the updated snapshot cannot be persisted.
    pub fn upsert_many(&self, records: Vec<FileRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut next = (*self.snapshot()).clone();
        for record in records {
            next.records.insert(record.rel_path.clone(), record);
        }
        self.commit(next)
    }

    /// Insert or replace a single record
    ///
    /// # Errors
    ///
    /// Returns an error if the updated snapshot cannot be persisted.
    pub fn upsert(&self, record: FileRecord) -> Result<()> {
        self.upsert_many(vec![record])
    }

    /// Drop records after trash moves
    ///
    /// # Errors
    ///
    /// Returns an error if the updated snapshot cannot be persisted.
    pub fn remove_many(&self, rel_paths: &[String]) -> Result<()> {
        if rel_paths.is_empty() {
            return Ok(());
        }

        let mut next = (*self.snapshot()).clone();
        for rel_path in rel_paths {
            next.records.remove(rel_path);
        }
        self.commit(next)
    }

    fn commit(&self, snapshot: IndexSnapshot) -> Result<()> {
        self.persist(&snapshot)?;

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(snapshot);
        Ok(())
    }

    fn persist(&self, snapshot: &IndexSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = IndexFile {
            built_at: snapshot.built_at,
            rows: snapshot.records.values().cloned().collect(),
        };

        let tmp_path = self.path.with_extension("json.tmp");
        let mut writer = std::io::BufWriter::new(fs::File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, &file)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        writer.flush()?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), rows = file.rows.len(), "index committed");
        Ok(())
    }

    fn read_snapshot(path: &Path) -> Result<IndexSnapshot> {
        let data = fs::read(path)?;
        let file: IndexFile =
            serde_json::from_slice(&data).map_err(|e| Error::IndexCorruption {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(IndexSnapshot::from_records(file.rows, file.built_at))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn record(rel: &str, size: u64, mtime: i64) -> FileRecord {
        FileRecord {
            rel_path: rel.to_string(),
            size,
            mtime,
            digest: None,
        }
    }

    #[test]
    fn test_record_target() {
        assert_eq!(
            record("DATE_2026-02-12_M31/Light_001.fits", 1, 1).target(),
            "DATE_2026-02-12_M31"
        );
        assert_eq!(record("stray.txt", 1, 1).target(), "stray.txt");
    }

    #[test]
    fn test_records_under_respects_boundaries() {
        let snapshot = IndexSnapshot::from_records(
            vec![
                record("M31/a.fits", 1, 1),
                record("M31_reprocess/b.fits", 1, 1),
                record("M31/sub/c.fits", 1, 1),
                record("M42/d.fits", 1, 1),
            ],
            0,
        );

        let under: Vec<&str> = snapshot
            .records_under("M31")
            .map(|r| r.rel_path.as_str())
            .collect();
        assert_eq!(under, ["M31/a.fits", "M31/sub/c.fits"]);
    }

    #[test]
    fn test_rebuild_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");

        let store = IndexStore::open(&path).unwrap();
        store
            .rebuild(vec![record("M31/a.fits", 10, 100)])
            .unwrap();

        let reopened = IndexStore::open(&path).unwrap();
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("M31/a.fits").unwrap().size, 10);
        assert!(snapshot.built_at() > 0);
    }

    #[test]
    fn test_rebuild_replaces_stale_entries() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::open(tmp.path().join("index.json")).unwrap();

        store
            .rebuild(vec![record("M31/a.fits", 1, 1), record("M31/gone.fits", 1, 1)])
            .unwrap();
        store.rebuild(vec![record("M31/a.fits", 2, 2)]).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("M31/gone.fits").is_none());
    }

    #[test]
    fn test_readers_keep_old_snapshot_across_rebuild() {
        let tmp = TempDir::new().unwrap();
        let store = IndexStore::open(tmp.path().join("index.json")).unwrap();
        store.rebuild(vec![record("M31/a.fits", 1, 1)]).unwrap();

        let before = store.snapshot();
        store.rebuild(vec![record("M42/b.fits", 1, 1)]).unwrap();

        // The reader's snapshot is unaffected by the swap
        assert!(before.get("M31/a.fits").is_some());
        assert!(store.snapshot().get("M31/a.fits").is_none());
    }

    #[test]
    fn test_upsert_and_remove_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let store = IndexStore::open(&path).unwrap();

        store.upsert(record("M31/a.fits", 5, 50)).unwrap();
        store.upsert(record("M31/a.fits", 7, 70)).unwrap();
        store.upsert(record("M42/b.fits", 1, 10)).unwrap();
        store
            .remove_many(&["M42/b.fits".to_string()])
            .unwrap();

        let reopened = IndexStore::open(&path).unwrap();
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("M31/a.fits").unwrap().size, 7);
    }

    #[test]
    fn test_corrupt_index_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let result = IndexStore::open(&path);
        assert!(matches!(result, Err(Error::IndexCorruption { .. })));
    }

    #[test]
    fn test_targets() {
        let snapshot = IndexSnapshot::from_records(
            vec![
                record("M31/a.fits", 1, 1),
                record("M31/b.fits", 1, 1),
                record("M42/c.fits", 1, 1),
            ],
            0,
        );

        let targets: Vec<String> = snapshot.targets().into_iter().collect();
        assert_eq!(targets, ["M31", "M42"]);
    }
}
