//! Two-sided target classification and transfer planning
//!
//! All comparisons read two immutable [`IndexSnapshot`]s and never touch the
//! filesystem, so they are safe to run while an index rebuild or a queue
//! execution is in flight. Classification is a pure view: running it twice
//! over unchanged snapshots yields identical results.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use crate::index::{FileRecord, IndexSnapshot};
use crate::scanner::{CompareMode, FLAT_SEGMENT};

/// Equality policy for two records of the same path
///
/// Metadata equality is the default signal: sizes must match and modified
/// times must agree within the tolerance. When both sides carry a content
/// digest, digest equality supersedes metadata entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualityPolicy {
    /// Allowed modified-time difference in seconds
    pub mtime_tolerance_secs: i64,
}

impl EqualityPolicy {
    /// Whether two records count as the same file content
    #[must_use]
    pub fn records_equal(&self, a: &FileRecord, b: &FileRecord) -> bool {
        if let (Some(da), Some(db)) = (&a.digest, &b.digest) {
            return da == db;
        }

        a.size == b.size && (a.mtime - b.mtime).abs() <= self.mtime_tolerance_secs
    }
}

/// Per-file diff counts for one target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffCounts {
    /// Present on both sides and equal
    pub matched: usize,
    /// Present on the remote side only
    pub missing_local: usize,
    /// Present on the local side only
    pub missing_remote: usize,
    /// Present on both sides but unequal
    pub differing: usize,
}

impl DiffCounts {
    /// Whether every mismatch count is zero
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.missing_local == 0 && self.missing_remote == 0 && self.differing == 0
    }
}

/// Synchronization status of one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// Remote has files, local has none of them
    NotPulled,
    /// Some remote files are still missing locally
    PartiallyPulled,
    /// The sides disagree: differing content or local-only files
    LocalDiffers,
    /// Every in-scope file matches
    UpToDate,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotPulled => "Not pulled",
            Self::PartiallyPulled => "Partially pulled",
            Self::LocalDiffers => "Local differs",
            Self::UpToDate => "Up to date",
        };
        f.write_str(text)
    }
}

/// Classification of one target across both sides
#[derive(Debug, Clone)]
pub struct TargetReport {
    /// Target name (first path segment)
    pub target: String,
    /// Capture date parsed from the `DATE_` name prefix, if any
    pub recent_date: Option<NaiveDate>,
    /// Derived status
    pub status: TargetStatus,
    /// Per-file diff counts under the active compare mode
    pub counts: DiffCounts,
    /// In-scope files on the local side
    pub local_files: usize,
    /// In-scope files on the remote side
    pub remote_files: usize,
    /// Newest remote mtime among files missing locally
    pub missing_latest_mtime: Option<i64>,
}

/// Capture date from a `DATE_YYYY-MM-DD...` target name
#[must_use]
pub fn parse_recent_date(target: &str) -> Option<NaiveDate> {
    let rest = target.strip_prefix("DATE_")?;
    let date = rest.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Classify one target from the two sides' snapshots
///
/// Returns `None` when the target has no in-scope remote files: such names
/// are not valid pull targets and are excluded from status views (the
/// capture-side [`safety_view`] covers the local→remote direction).
#[must_use]
pub fn classify(
    target: &str,
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    mode: CompareMode,
    policy: &EqualityPolicy,
) -> Option<TargetReport> {
    let remote_records: Vec<&FileRecord> = remote
        .records_under(target)
        .filter(|r| mode.includes(&r.rel_path))
        .collect();
    if remote_records.is_empty() {
        return None;
    }

    let mut counts = DiffCounts::default();
    let mut missing_latest_mtime = None;
    let mut local_files = 0usize;

    for record in &remote_records {
        match local.get(&record.rel_path) {
            Some(local_record) => {
                if policy.records_equal(local_record, record) {
                    counts.matched += 1;
                } else {
                    counts.differing += 1;
                }
            }
            None => {
                counts.missing_local += 1;
                missing_latest_mtime =
                    Some(missing_latest_mtime.map_or(record.mtime, |m: i64| m.max(record.mtime)));
            }
        }
    }

    for record in local.records_under(target) {
        if !mode.includes(&record.rel_path) {
            continue;
        }
        local_files += 1;
        if remote.get(&record.rel_path).is_none() {
            counts.missing_remote += 1;
        }
    }

    let status = if counts.missing_local > 0 && counts.matched == 0 && counts.missing_remote == 0 {
        TargetStatus::NotPulled
    } else if counts.missing_local > 0 {
        TargetStatus::PartiallyPulled
    } else if counts.differing > 0 || counts.missing_remote > 0 {
        TargetStatus::LocalDiffers
    } else {
        TargetStatus::UpToDate
    };

    Some(TargetReport {
        target: target.to_string(),
        recent_date: parse_recent_date(target),
        status,
        counts,
        local_files,
        remote_files: remote_records.len(),
        missing_latest_mtime,
    })
}

/// Classify every target seen on either side
///
/// Internal namespaces (`_Trash`, `_FlatWizard`, anything `_`-prefixed) are
/// skipped; results are ordered by case-insensitive target name.
#[must_use]
pub fn classify_all(
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    mode: CompareMode,
    policy: &EqualityPolicy,
) -> Vec<TargetReport> {
    let mut targets: BTreeSet<String> = remote.targets();
    targets.extend(local.targets());

    let mut reports: Vec<TargetReport> = targets
        .iter()
        .filter(|t| !t.starts_with('_'))
        .filter_map(|t| classify(t, local, remote, mode, policy))
        .collect();

    reports.sort_by_key(|r| r.target.to_lowercase());
    reports
}

/// Order reports newest capture first; undated targets sort last
pub fn sort_by_recent_date(reports: &mut [TargetReport]) {
    reports.sort_by(|a, b| match (a.recent_date, b.recent_date) {
        (Some(da), Some(db)) => db.cmp(&da).then_with(|| a.target.cmp(&b.target)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.target.cmp(&b.target),
    });
}

/// Files to transfer for a pull: remote-only plus differing, in path order
#[must_use]
pub fn plan_pull(
    target: &str,
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    mode: CompareMode,
    policy: &EqualityPolicy,
) -> Vec<FileRecord> {
    remote
        .records_under(target)
        .filter(|r| mode.includes(&r.rel_path))
        .filter(|r| {
            local
                .get(&r.rel_path)
                .is_none_or(|l| !policy.records_equal(l, r))
        })
        .cloned()
        .collect()
}

/// Flat-session files to pull alongside a target
///
/// Sessions are the directory names directly under the target on the remote
/// side; for each, the matching `_FlatWizard/<session>/` tree contributes
/// its remote-only and differing files.
#[must_use]
pub fn plan_pull_flats(
    target: &str,
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    policy: &EqualityPolicy,
) -> Vec<FileRecord> {
    let sessions: BTreeSet<&str> = remote
        .records_under(target)
        .filter_map(|r| {
            let mut parts = r.rel_path.split('/');
            let _target = parts.next()?;
            let session = parts.next()?;
            // A two-segment path is a file directly under the target
            parts.next()?;
            Some(session)
        })
        .collect();

    let mut planned = Vec::new();
    for session in sessions {
        let prefix = format!("{FLAT_SEGMENT}/{session}");
        planned.extend(
            remote
                .records_under(&prefix)
                .filter(|r| {
                    local
                        .get(&r.rel_path)
                        .is_none_or(|l| !policy.records_equal(l, r))
                })
                .cloned(),
        );
    }

    planned
}

/// Files to transfer for a push: local-only plus differing, in path order
#[must_use]
pub fn plan_push(
    target: &str,
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    mode: CompareMode,
    policy: &EqualityPolicy,
) -> Vec<FileRecord> {
    local
        .records_under(target)
        .filter(|r| mode.includes(&r.rel_path))
        .filter(|r| {
            remote
                .get(&r.rel_path)
                .is_none_or(|l| !policy.records_equal(l, r))
        })
        .cloned()
        .collect()
}

/// Remote-only files eligible for a trash move
///
/// With a checkpoint, only files whose remote mtime predates the last
/// successful pull qualify; without one (forced), every remote-only file
/// under the target does. Compare mode does not apply: a trash move must
/// see the whole namespace.
#[must_use]
pub fn plan_trash(
    target: &str,
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    checkpoint: Option<i64>,
) -> Vec<FileRecord> {
    remote
        .records_under(target)
        .filter(|r| local.get(&r.rel_path).is_none())
        .filter(|r| checkpoint.is_none_or(|cp| r.mtime <= cp))
        .cloned()
        .collect()
}

/// Capture-side safety summary for one local folder
#[derive(Debug, Clone, Default)]
pub struct FolderSafety {
    /// Top-level folder name (or `(root)` for stray files)
    pub folder: String,
    /// Local files seen under the folder
    pub local_files: usize,
    /// Files with an equal remote copy
    pub backed_up: usize,
    /// Files with no remote copy
    pub missing_remote: usize,
    /// Files whose remote copy differs
    pub differing: usize,
}

impl FolderSafety {
    /// Whether every local file has an equal remote copy
    #[must_use]
    pub const fn safe_to_delete(&self) -> bool {
        self.local_files > 0 && self.missing_remote == 0 && self.differing == 0
    }
}

/// Grand totals across a [`safety_view`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetySummary {
    /// Total local files in scope
    pub local_files: usize,
    /// Total files with an equal remote copy
    pub backed_up: usize,
    /// Total files with no remote copy
    pub missing_remote: usize,
    /// Total files whose remote copy differs
    pub differing: usize,
}

/// Local→remote safety view: which local folders are fully backed up
#[must_use]
pub fn safety_view(
    local: &IndexSnapshot,
    remote: &IndexSnapshot,
    mode: CompareMode,
    policy: &EqualityPolicy,
) -> (Vec<FolderSafety>, SafetySummary) {
    let mut folders: std::collections::BTreeMap<String, FolderSafety> =
        std::collections::BTreeMap::new();

    for record in local.records() {
        if !mode.includes(&record.rel_path) {
            continue;
        }

        let folder = if record.rel_path.contains('/') {
            record.target().to_string()
        } else {
            "(root)".to_string()
        };
        let entry = folders.entry(folder.clone()).or_insert_with(|| FolderSafety {
            folder,
            ..FolderSafety::default()
        });

        entry.local_files += 1;
        match remote.get(&record.rel_path) {
            Some(remote_record) if policy.records_equal(record, remote_record) => {
                entry.backed_up += 1;
            }
            Some(_) => entry.differing += 1,
            None => entry.missing_remote += 1,
        }
    }

    let mut ordered: Vec<FolderSafety> = folders.into_values().collect();
    ordered.sort_by_key(|f| f.folder.to_lowercase());

    let summary = ordered.iter().fold(SafetySummary::default(), |mut acc, f| {
        acc.local_files += f.local_files;
        acc.backed_up += f.backed_up;
        acc.missing_remote += f.missing_remote;
        acc.differing += f.differing;
        acc
    });

    (ordered, summary)
}
