use apsync::index::IndexStore;

use crate::commands::Settings;

pub struct RebuildIndex;

impl RebuildIndex {
    pub fn execute(settings: &Settings) -> anyhow::Result<()> {
        println!("Rebuilding remote index (this rescans the NAS share)...");

        // Start from an empty store: a rebuild never trusts the old file
        let store = IndexStore::empty(settings.remote_index_path());
        let rows = settings.rebuild_remote_index(&store)?;

        println!(
            "Rebuilt remote index with {rows} file(s) at {}",
            store.path().display()
        );
        Ok(())
    }
}
