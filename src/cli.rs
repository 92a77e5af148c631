use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Astrophotography Capture Backup Manager
///
/// Compare dated capture targets between a local root and a mounted NAS share,
/// then pull, push, or trash them through an ordered action queue
#[derive(Parser, Debug)]
#[command(name = "apsync")]
#[command(long_about = None, version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use specific config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the local capture root
    #[arg(long, global = true, value_name = "PATH", env = "APSYNC_LOCAL_ROOT")]
    pub local_root: Option<PathBuf>,

    /// Override the mounted NAS backup root
    #[arg(long, global = true, value_name = "PATH", env = "APSYNC_REMOTE_ROOT")]
    pub remote_root: Option<PathBuf>,

    /// Path filter for scans and comparisons
    #[arg(long, global = true, value_enum)]
    pub mode: Option<ModeArg>,

    /// Modified-time tolerance for metadata equality, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub tolerance: Option<i64>,

    /// Hash file contents during scans (strict equality)
    #[arg(long, global = true)]
    pub digest: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify every target and show recommended actions
    Status {
        /// Rebuild the remote index before classifying
        #[arg(long)]
        rebuild: bool,

        /// Order targets by capture date instead of name
        #[arg(long)]
        by_date: bool,

        /// Only show targets with a recommended action
        #[arg(long)]
        action_needed: bool,
    },

    /// Capture-side view: which local folders are fully backed up
    Compare,

    /// Rescan the NAS share and rewrite the remote index
    RebuildIndex,

    /// Pull the named targets from the NAS, in order
    Pull {
        /// Target folder names
        #[arg(required = true)]
        targets: Vec<String>,

        /// Also pull matching _FlatWizard sessions
        #[arg(long)]
        include_flats: bool,
    },

    /// Push the named targets to the NAS, in order
    Push {
        /// Target folder names
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Move remote-only files of the named targets into the NAS trash
    Trash {
        /// Target folder names
        #[arg(required = true)]
        targets: Vec<String>,

        /// Skip the pull-checkpoint safety requirement
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Science data (exclude WBPP/Processing)
    Images,
    /// Work-in-progress only (WBPP/Processing)
    Wip,
}
