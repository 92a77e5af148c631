//! Recommended-action policy table
//!
//! A recommendation is a pure function of a target's classification counts
//! plus the pull-checkpoint state. It never inspects file contents and is
//! never auto-executed; the operator queues actions explicitly.

use std::fmt;

use crate::comparison::{TargetReport, TargetStatus};

/// Suggested next action for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedAction {
    /// Copy missing/differing files from the NAS to the local root
    PullToLocal,
    /// Copy local-only files up to the NAS
    PushToNas,
    /// Move remote-only files into the NAS trash namespace
    DeleteOnNas,
    /// Nothing to do, or the state is ambiguous and needs inspection
    NoAction,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PullToLocal => "Pull to local",
            Self::PushToNas => "Push to NAS",
            Self::DeleteOnNas => "Delete on NAS (trash)",
            Self::NoAction => "No action",
        };
        f.write_str(text)
    }
}

/// Map a classification to a recommended action
///
/// Policy table, exhaustive by status:
///
/// | status            | recommendation                                        |
/// |-------------------|-------------------------------------------------------|
/// | `NotPulled`       | `PullToLocal`, or `DeleteOnNas` past the checkpoint   |
/// | `PartiallyPulled` | `PullToLocal`, or `DeleteOnNas` past the checkpoint   |
/// | `LocalDiffers`    | `PushToNas` for a pure local surplus, else `NoAction` |
/// | `UpToDate`        | `NoAction`                                            |
///
/// The checkpoint escape hatch: when every remote file missing locally
/// predates the target's last successful pull, those files were pulled once
/// and deliberately culled locally, so re-pulling them would resurrect
/// rejects. `DeleteOnNas` is only ever a trash move.
#[must_use]
pub fn recommend(report: &TargetReport, last_pull: Option<i64>) -> RecommendedAction {
    match report.status {
        TargetStatus::NotPulled | TargetStatus::PartiallyPulled => {
            if let (Some(checkpoint), Some(latest)) = (last_pull, report.missing_latest_mtime) {
                if latest <= checkpoint {
                    return RecommendedAction::DeleteOnNas;
                }
            }
            RecommendedAction::PullToLocal
        }
        TargetStatus::LocalDiffers => {
            // A target whose only disagreement is local-only files is an
            // unambiguous push candidate; differing content needs a human.
            if report.counts.differing == 0 && report.counts.missing_local == 0 {
                RecommendedAction::PushToNas
            } else {
                RecommendedAction::NoAction
            }
        }
        TargetStatus::UpToDate => RecommendedAction::NoAction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::DiffCounts;

    fn report(status: TargetStatus, counts: DiffCounts) -> TargetReport {
        TargetReport {
            target: "DATE_2026-02-12_M31".to_string(),
            recent_date: None,
            status,
            counts,
            local_files: 0,
            remote_files: 10,
            missing_latest_mtime: None,
        }
    }

    #[test]
    fn test_not_pulled_recommends_pull() {
        let report = report(
            TargetStatus::NotPulled,
            DiffCounts {
                missing_local: 50,
                ..DiffCounts::default()
            },
        );
        assert_eq!(recommend(&report, None), RecommendedAction::PullToLocal);
    }

    #[test]
    fn test_partially_pulled_recommends_pull() {
        let report = report(
            TargetStatus::PartiallyPulled,
            DiffCounts {
                matched: 48,
                missing_local: 2,
                ..DiffCounts::default()
            },
        );
        assert_eq!(recommend(&report, None), RecommendedAction::PullToLocal);
    }

    #[test]
    fn test_missing_files_older_than_checkpoint_recommend_trash() {
        let mut r = report(
            TargetStatus::PartiallyPulled,
            DiffCounts {
                matched: 48,
                missing_local: 2,
                ..DiffCounts::default()
            },
        );
        r.missing_latest_mtime = Some(1000);

        assert_eq!(recommend(&r, Some(2000)), RecommendedAction::DeleteOnNas);
        // A missing file newer than the checkpoint flips back to pull
        r.missing_latest_mtime = Some(3000);
        assert_eq!(recommend(&r, Some(2000)), RecommendedAction::PullToLocal);
    }

    #[test]
    fn test_local_differs_needs_inspection() {
        let report = report(
            TargetStatus::LocalDiffers,
            DiffCounts {
                matched: 40,
                differing: 10,
                ..DiffCounts::default()
            },
        );
        assert_eq!(recommend(&report, None), RecommendedAction::NoAction);
    }

    #[test]
    fn test_pure_local_surplus_recommends_push() {
        let report = report(
            TargetStatus::LocalDiffers,
            DiffCounts {
                matched: 40,
                missing_remote: 3,
                ..DiffCounts::default()
            },
        );
        assert_eq!(recommend(&report, None), RecommendedAction::PushToNas);
    }

    #[test]
    fn test_up_to_date_recommends_nothing() {
        let report = report(
            TargetStatus::UpToDate,
            DiffCounts {
                matched: 50,
                ..DiffCounts::default()
            },
        );
        assert_eq!(recommend(&report, Some(123)), RecommendedAction::NoAction);
    }
}
