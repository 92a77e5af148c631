use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use apsync::queue::{Queue, QueueAction};
use apsync::state::StateStore;
use apsync::sync::{ProgressEvent, QueueExecutor, QueueReporter, SyncContext};
use apsync::transport::FsTransport;

use crate::commands::Settings;

pub struct RunQueue;

impl RunQueue {
    /// Enqueue one action per named target and drain the queue
    pub fn execute(
        settings: &Settings,
        targets: &[String],
        action: QueueAction,
        cancel: Arc<AtomicBool>,
    ) -> anyhow::Result<()> {
        let mut queue = Queue::new();
        for target in targets {
            queue
                .enqueue(target.clone(), action)
                .with_context(|| format!("queueing {target}"))?;
        }

        println!("Refreshing local index...");
        let local_index = settings.refresh_local_index()?;
        let remote_index = settings.load_remote_index(false)?;
        let state = StateStore::open(&settings.local_root);

        let transport = FsTransport::new(&settings.remote_root);
        let ctx = SyncContext {
            local_root: &settings.local_root,
            remote_root: &settings.remote_root,
            local_index: &local_index,
            remote_index: &remote_index,
            state: &state,
            mode: settings.mode,
            policy: settings.policy,
        };

        let executor = QueueExecutor::new(&transport, ctx).with_cancel_flag(cancel);
        let verbose = settings.verbose;
        executor.run(&mut queue, &mut |event| match event {
            ProgressEvent::ItemStarted { target, action } => {
                println!("-> {action} {target}");
            }
            ProgressEvent::FileProcessed {
                target,
                processed,
                planned,
                rel_path,
            } => {
                if verbose {
                    println!("   {target}: {processed}/{planned} {rel_path}");
                } else {
                    print!("\r   {target}: {processed}/{planned}");
                    let _ = std::io::stdout().flush();
                }
            }
            ProgressEvent::ItemFinished { target, status } => {
                if !verbose {
                    println!();
                }
                println!("   {target}: {status}");
            }
        });

        println!("{}", QueueReporter::generate_summary(&queue));
        Ok(())
    }
}
