use apsync::comparison::safety_view;

use crate::commands::Settings;

pub struct Compare;

impl Compare {
    pub fn execute(settings: &Settings) -> anyhow::Result<()> {
        println!("Refreshing local index...");
        let local = settings.refresh_local_index()?;
        let remote = settings.load_remote_index(false)?;

        let (folders, summary) = safety_view(
            &local.snapshot(),
            &remote.snapshot(),
            settings.mode,
            &settings.policy,
        );

        println!(
            "{:<28} {:>6} {:>9} {:>8} {:>6}  {}",
            "Folder", "Local", "BackedUp", "Missing", "Differ", "SafeToDelete"
        );
        for folder in &folders {
            println!(
                "{:<28} {:>6} {:>9} {:>8} {:>6}  {}",
                folder.folder,
                folder.local_files,
                folder.backed_up,
                folder.missing_remote,
                folder.differing,
                if folder.safe_to_delete() { "Yes" } else { "No" },
            );
        }

        let safe = folders.iter().filter(|f| f.safe_to_delete()).count();
        println!(
            "\nLocal={}, BackedUp={}, Missing={}, Different={}, SafeFolders={safe}/{}",
            summary.local_files,
            summary.backed_up,
            summary.missing_remote,
            summary.differing,
            folders.len()
        );
        println!("Read-only comparison made no file changes.");

        Ok(())
    }
}
