mod cli;
mod commands;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use apsync::queue::QueueAction;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Settings;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Console logging; RUST_LOG=debug surfaces per-file transfer logs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // First Ctrl+C asks the executor to stop after the current file;
    // a second one aborts outright
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            if cancel.swap(true, Ordering::SeqCst) {
                eprintln!("\nInterrupted again, aborting");
                std::process::exit(130); // Standard exit code for SIGINT
            }
            eprintln!("\nStopping after the current file (Ctrl+C again to abort)");
        })
        .context("Failed to set Ctrl+C handler")?;
    }

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    if cli.verbose {
        // Config's Debug impl redacts the password
        println!("Active configuration: {:?}", settings.config);
    }

    match &cli.command {
        Commands::Status {
            rebuild,
            by_date,
            action_needed,
        } => {
            commands::Status::execute(&settings, *rebuild, *by_date, *action_needed)
                .context("Failed to execute status command")?;
        }
        Commands::Compare => {
            commands::Compare::execute(&settings).context("Failed to execute compare command")?;
        }
        Commands::RebuildIndex => {
            commands::RebuildIndex::execute(&settings)
                .context("Failed to execute rebuild-index command")?;
        }
        Commands::Pull {
            targets,
            include_flats,
        } => {
            commands::RunQueue::execute(
                &settings,
                targets,
                QueueAction::Pull {
                    include_flats: *include_flats || settings.config.include_flats,
                },
                cancel,
            )
            .context("Failed to execute pull command")?;
        }
        Commands::Push { targets } => {
            commands::RunQueue::execute(&settings, targets, QueueAction::Push, cancel)
                .context("Failed to execute push command")?;
        }
        Commands::Trash { targets, force } => {
            commands::RunQueue::execute(
                &settings,
                targets,
                QueueAction::Trash { force: *force },
                cancel,
            )
            .context("Failed to execute trash command")?;
        }
    }

    Ok(())
}
