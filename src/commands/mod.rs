mod compare;
mod rebuild_index;
mod run_queue;
mod status;

pub use compare::Compare;
pub use rebuild_index::RebuildIndex;
pub use run_queue::RunQueue;
pub use status::Status;

use std::path::PathBuf;

use anyhow::Context;
use apsync::comparison::EqualityPolicy;
use apsync::config::Config;
use apsync::error::Error;
use apsync::index::IndexStore;
use apsync::scanner::{CompareMode, PRIVATE_PREFIX, Scanner};
use tracing::warn;

use crate::cli::{Cli, ModeArg};

/// Remote index file name, stored on the share root itself
const REMOTE_INDEX_FILENAME: &str = ".apsync_index.json";

/// Resolved runtime settings: merged config plus CLI overrides
pub struct Settings {
    pub config: Config,
    pub local_root: PathBuf,
    pub remote_root: PathBuf,
    pub mode: CompareMode,
    pub policy: EqualityPolicy,
    pub use_digest: bool,
    pub verbose: bool,
}

impl Settings {
    /// Merge config files and CLI flags into concrete settings
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config =
            apsync::config::load(cli.config.as_deref()).context("loading configuration")?;

        // CLI flags override config file settings
        if let Some(path) = &cli.local_root {
            config.local_root = Some(path.clone());
        }
        if let Some(path) = &cli.remote_root {
            config.remote_root = Some(path.clone());
        }
        if let Some(mode) = cli.mode {
            config.compare_mode = Some(match mode {
                ModeArg::Images => CompareMode::Images,
                ModeArg::Wip => CompareMode::Wip,
            });
        }
        if let Some(tolerance) = cli.tolerance {
            config.mtime_tolerance_secs = Some(tolerance);
        }
        config.use_digest |= cli.digest;

        let local_root = config
            .local_root
            .clone()
            .context("local root not configured; pass --local-root or set local_root")?;
        let local_root = dunce::canonicalize(&local_root)
            .with_context(|| format!("local root does not exist: {}", local_root.display()))?;

        // The remote root may be temporarily unreachable; keep it as given
        let remote_root = config
            .remote_root
            .clone()
            .context("remote root not configured; pass --remote-root or set remote_root")?;

        let mode = config.compare_mode();
        let policy = config.equality_policy();
        let use_digest = config.use_digest;

        Ok(Self {
            config,
            local_root,
            remote_root,
            mode,
            policy,
            use_digest,
            verbose: cli.verbose,
        })
    }

    fn index_scanner(&self) -> Scanner {
        // Indexes hold the complete tree; mode filtering happens at query time
        Scanner::unfiltered().with_digests(self.use_digest)
    }

    pub fn local_index_path(&self) -> PathBuf {
        self.local_root.join(PRIVATE_PREFIX).join("local_index.json")
    }

    pub fn remote_index_path(&self) -> PathBuf {
        self.remote_root.join(REMOTE_INDEX_FILENAME)
    }

    /// Open the local index and refresh it from a fresh scan
    ///
    /// The local side is cheap to walk, so every comparison starts from
    /// current disk state; a corrupt index file is discarded and rebuilt.
    pub fn refresh_local_index(&self) -> anyhow::Result<IndexStore> {
        let path = self.local_index_path();
        let store = match IndexStore::open(&path) {
            Ok(store) => store,
            Err(Error::IndexCorruption { path, reason }) => {
                warn!(path = %path.display(), reason = %reason, "discarding corrupt local index");
                IndexStore::empty(path)
            }
            Err(e) => return Err(e.into()),
        };

        let records = self
            .index_scanner()
            .scan_collect(&self.local_root)
            .context("scanning local root")?;
        store.rebuild(records).context("writing local index")?;
        Ok(store)
    }

    /// Open the remote index, rebuilding it when asked, missing, or corrupt
    pub fn load_remote_index(&self, force_rebuild: bool) -> anyhow::Result<IndexStore> {
        let path = self.remote_index_path();
        let (store, mut needs_rebuild) = match IndexStore::open(&path) {
            Ok(store) => (store, force_rebuild),
            Err(Error::IndexCorruption { path, reason }) => {
                warn!(path = %path.display(), reason = %reason, "remote index unreadable, forcing rebuild");
                (IndexStore::empty(path), true)
            }
            Err(e) => return Err(e.into()),
        };

        if !needs_rebuild && !path.exists() {
            needs_rebuild = true;
        }

        if needs_rebuild {
            self.rebuild_remote_index(&store)?;
        }
        Ok(store)
    }

    /// Rescan the NAS share and rewrite the remote index; returns row count
    pub fn rebuild_remote_index(&self, store: &IndexStore) -> anyhow::Result<usize> {
        let records = self
            .index_scanner()
            .scan_collect(&self.remote_root)
            .context("scanning NAS share")?;
        let count = records.len();
        store.rebuild(records).context("writing remote index")?;
        Ok(count)
    }
}
