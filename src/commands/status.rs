use apsync::comparison::{classify_all, sort_by_recent_date};
use apsync::recommend::{RecommendedAction, recommend};
use apsync::state::StateStore;

use crate::commands::Settings;

pub struct Status;

impl Status {
    pub fn execute(
        settings: &Settings,
        rebuild: bool,
        by_date: bool,
        action_needed: bool,
    ) -> anyhow::Result<()> {
        if settings.verbose {
            println!("Local root:  {}", settings.local_root.display());
            println!("Remote root: {}", settings.remote_root.display());
            println!("Mode: {:?}", settings.mode);
        }

        println!("Refreshing local index...");
        let local = settings.refresh_local_index()?;
        if rebuild {
            println!("Rebuilding remote index (this rescans the NAS share)...");
        }
        let remote = settings.load_remote_index(rebuild)?;
        let state = StateStore::open(&settings.local_root);

        let mut reports = classify_all(
            &local.snapshot(),
            &remote.snapshot(),
            settings.mode,
            &settings.policy,
        );
        if by_date {
            sort_by_recent_date(&mut reports);
        }

        println!(
            "{:<28} {:<10} {:>5} {:>5} {:>7} {:>8} {:>7} {:>6}  {:<16} {}",
            "Target",
            "Date",
            "NAS",
            "Local",
            "Matched",
            "Missing",
            "LclOnly",
            "Differ",
            "Status",
            "Recommended"
        );

        let mut action_candidates = 0;
        let mut up_to_date = 0;
        let mut shown = 0;
        for report in &reports {
            let action = recommend(report, state.last_pull(&report.target));
            if action != RecommendedAction::NoAction {
                action_candidates += 1;
            }
            if report.counts.is_clean() {
                up_to_date += 1;
            }
            if action_needed && action == RecommendedAction::NoAction {
                continue;
            }
            shown += 1;

            let date = report
                .recent_date
                .map_or_else(|| "-".to_string(), |d| d.to_string());
            println!(
                "{:<28} {:<10} {:>5} {:>5} {:>7} {:>8} {:>7} {:>6}  {:<16} {}",
                report.target,
                date,
                report.remote_files,
                report.local_files,
                report.counts.matched,
                report.counts.missing_local,
                report.counts.missing_remote,
                report.counts.differing,
                report.status.to_string(),
                action,
            );
        }

        if action_needed && shown == 0 {
            println!("(no targets need action)");
        }
        println!(
            "\nTargets: {}, action candidates: {action_candidates}, up to date: {up_to_date}",
            reports.len()
        );

        Ok(())
    }
}
