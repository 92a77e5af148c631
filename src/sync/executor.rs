//! Sequential queue execution
//!
//! The executor drains a [`Queue`] head-to-tail with exactly one item
//! running and one file in flight at any time: the share is a single
//! bandwidth-limited resource, and serializing transfers keeps progress
//! percentages honest. Failures stay file-granular; an item only ends
//! `Failed` when it cannot begin at all or is cancelled mid-flight.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::comparison::{EqualityPolicy, plan_pull, plan_pull_flats, plan_push, plan_trash};
use crate::error::{Error, Result};
use crate::index::{FileRecord, IndexSnapshot, IndexStore};
use crate::queue::{Counters, ItemStatus, Queue, QueueAction, QueueItem};
use crate::scanner::{CompareMode, FrameKind, frame_kind, unix_mtime};
use crate::skiplog::{SkipLogger, SkipReason};
use crate::state::StateStore;
use crate::transport::Transport;

/// Shared context the executor reads while running items
pub struct SyncContext<'a> {
    /// Local capture root
    pub local_root: &'a Path,
    /// Mounted remote backup root
    pub remote_root: &'a Path,
    /// Local-side index, upserted after successful pulls
    pub local_index: &'a IndexStore,
    /// Remote-side index, upserted after pushes and pruned after trash moves
    pub remote_index: &'a IndexStore,
    /// Pull-checkpoint store
    pub state: &'a StateStore,
    /// Path filter for transfer planning
    pub mode: CompareMode,
    /// Record equality policy
    pub policy: EqualityPolicy,
}

/// Progress notifications emitted while the queue drains
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// An item moved from Pending to Running
    ItemStarted {
        /// Target being processed
        target: &'a str,
        /// Action verb (`pull`, `push`, `trash`)
        action: &'static str,
    },
    /// One planned file was accounted for (copied, skipped, or errored)
    FileProcessed {
        /// Target being processed
        target: &'a str,
        /// Files accounted for so far
        processed: usize,
        /// Planned file count for the item
        planned: usize,
        /// Relative path just handled
        rel_path: &'a str,
    },
    /// An item reached Done or Failed
    ItemFinished {
        /// Target that finished
        target: &'a str,
        /// Final status
        status: ItemStatus,
    },
}

/// Sequential queue executor
pub struct QueueExecutor<'a, T: Transport> {
    transport: &'a T,
    ctx: SyncContext<'a>,
    cancel: Arc<AtomicBool>,
}

impl<'a, T: Transport> QueueExecutor<'a, T> {
    /// Create an executor over a transport and shared context
    #[must_use]
    pub fn new(transport: &'a T, ctx: SyncContext<'a>) -> Self {
        Self {
            transport,
            ctx,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally-owned cancel flag (e.g. wired to Ctrl+C)
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that requests a stop after the current file completes
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Drain the queue head-to-tail
    ///
    /// Every Pending item is executed in order. A Failed item never blocks
    /// the rest of the queue; cancellation stops after the current file and
    /// leaves not-yet-started items Pending.
    pub fn run(&self, queue: &mut Queue, progress: &mut dyn FnMut(ProgressEvent<'_>)) {
        while let Some(index) = queue.next_pending() {
            if self.cancelled() {
                info!("queue stopped before next item");
                break;
            }

            let item = queue.item_mut(index);
            item.status = ItemStatus::Running;
            let target = item.target.clone();
            let action = item.action.label();
            info!(item = %target, action, "queue item started");
            progress(ProgressEvent::ItemStarted {
                target: &target,
                action,
            });

            let outcome = self.execute_item(queue.item_mut(index), progress);
            let item = queue.item_mut(index);
            item.status = match outcome {
                Ok(()) => ItemStatus::Done,
                Err(e) => {
                    warn!(item = %target, error = %e, "queue item failed");
                    ItemStatus::Failed
                }
            };

            let totals = item.totals();
            info!(
                item = %target,
                status = %item.status,
                copied = totals.copied,
                skipped = totals.skipped,
                errors = totals.errors,
                "queue item finished"
            );
            progress(ProgressEvent::ItemFinished {
                target: &target,
                status: item.status,
            });
        }
    }

    fn execute_item(
        &self,
        item: &mut QueueItem,
        progress: &mut dyn FnMut(ProgressEvent<'_>),
    ) -> Result<()> {
        // Transport unreachable fails the whole item, not the queue
        self.transport.check_connectivity()?;

        let local = self.ctx.local_index.snapshot();
        let remote = self.ctx.remote_index.snapshot();

        match item.action {
            QueueAction::Pull { include_flats } => {
                self.run_pull(item, include_flats, &local, &remote, progress)
            }
            QueueAction::Push => self.run_push(item, &local, &remote, progress),
            QueueAction::Trash { force } => self.run_trash(item, force, &local, &remote, progress),
        }
    }

    fn run_pull(
        &self,
        item: &mut QueueItem,
        include_flats: bool,
        local: &IndexSnapshot,
        remote: &IndexSnapshot,
        progress: &mut dyn FnMut(ProgressEvent<'_>),
    ) -> Result<()> {
        let target = item.target.clone();
        let mut plan = plan_pull(&target, local, remote, self.ctx.mode, &self.ctx.policy);
        if include_flats {
            plan.extend(plan_pull_flats(&target, local, remote, &self.ctx.policy));
        }

        let mut logger = SkipLogger::create(self.ctx.local_root, &target)?;
        item.skip_log = Some(logger.path().to_path_buf());
        item.planned = plan.len();
        item.progress_percent = if plan.is_empty() { 100 } else { 0 };

        let mut pulled = Vec::new();
        for record in &plan {
            if self.cancelled() {
                self.ctx.local_index.upsert_many(pulled)?;
                return Err(Error::Cancelled);
            }

            let kind = frame_kind(&record.rel_path);
            let context = match kind {
                FrameKind::Light => "LIGHTS",
                FrameKind::Flat => "FLATS",
            };
            let dest = self.ctx.local_root.join(&record.rel_path);

            // Re-check the destination: the local index may be staler than disk
            if self.destination_matches(&dest, record) {
                self.bump(item, kind, |c| c.skipped += 1);
                self.log_skip(&mut logger, context, SkipReason::AlreadyPresent, record);
                pulled.push(record.clone());
            } else {
                let source = self.ctx.remote_root.join(&record.rel_path);
                match self.transport.copy(&source, &dest) {
                    Ok(()) => {
                        debug!(path = %record.rel_path, "pulled");
                        self.bump(item, kind, |c| c.copied += 1);
                        pulled.push(record.clone());
                    }
                    Err(e) => {
                        warn!(path = %record.rel_path, error = %e, "pull failed");
                        self.bump(item, kind, |c| c.errors += 1);
                        self.log_skip(&mut logger, context, SkipReason::TransferError, record);
                    }
                }
            }

            Self::advance(item, progress, &target, &record.rel_path);
        }

        self.ctx.local_index.upsert_many(pulled)?;

        if item.totals().errors == 0 {
            self.ctx
                .state
                .mark_pulled(&target, chrono::Utc::now().timestamp())?;
        }
        Ok(())
    }

    fn run_push(
        &self,
        item: &mut QueueItem,
        local: &IndexSnapshot,
        remote: &IndexSnapshot,
        progress: &mut dyn FnMut(ProgressEvent<'_>),
    ) -> Result<()> {
        let target = item.target.clone();
        let plan = plan_push(&target, local, remote, self.ctx.mode, &self.ctx.policy);

        let mut logger = SkipLogger::create(self.ctx.local_root, &target)?;
        item.skip_log = Some(logger.path().to_path_buf());
        item.planned = plan.len();
        item.progress_percent = if plan.is_empty() { 100 } else { 0 };

        let mut pushed = Vec::new();
        for record in &plan {
            if self.cancelled() {
                self.ctx.remote_index.upsert_many(pushed)?;
                return Err(Error::Cancelled);
            }

            let kind = frame_kind(&record.rel_path);
            let dest = self.ctx.remote_root.join(&record.rel_path);

            if self.destination_matches(&dest, record) {
                self.bump(item, kind, |c| c.skipped += 1);
                self.log_skip(&mut logger, "PUSH", SkipReason::AlreadyPresent, record);
                pushed.push(record.clone());
            } else {
                let source = self.ctx.local_root.join(&record.rel_path);
                match self.transport.copy(&source, &dest) {
                    Ok(()) => {
                        debug!(path = %record.rel_path, "pushed");
                        self.bump(item, kind, |c| c.copied += 1);
                        pushed.push(record.clone());
                    }
                    Err(e) => {
                        warn!(path = %record.rel_path, error = %e, "push failed");
                        self.bump(item, kind, |c| c.errors += 1);
                        self.log_skip(&mut logger, "PUSH", SkipReason::TransferError, record);
                    }
                }
            }

            Self::advance(item, progress, &target, &record.rel_path);
        }

        self.ctx.remote_index.upsert_many(pushed)?;
        Ok(())
    }

    fn run_trash(
        &self,
        item: &mut QueueItem,
        force: bool,
        local: &IndexSnapshot,
        remote: &IndexSnapshot,
        progress: &mut dyn FnMut(ProgressEvent<'_>),
    ) -> Result<()> {
        let target = item.target.clone();

        let checkpoint = if force {
            None
        } else {
            match self.ctx.state.last_pull(&target) {
                Some(checkpoint) => Some(checkpoint),
                None => return Err(Error::MissingCheckpoint(target)),
            }
        };

        let plan = plan_trash(&target, local, remote, checkpoint);

        let mut logger = SkipLogger::create(self.ctx.local_root, &target)?;
        item.skip_log = Some(logger.path().to_path_buf());
        item.planned = plan.len();
        item.progress_percent = if plan.is_empty() { 100 } else { 0 };

        let date_tag = chrono::Local::now().format("%Y-%m-%d").to_string();
        let mut moved = Vec::new();
        for record in &plan {
            if self.cancelled() {
                self.ctx.remote_index.remove_many(&moved)?;
                return Err(Error::Cancelled);
            }

            let kind = frame_kind(&record.rel_path);
            let trash_rel = format!("_Trash/{date_tag}/{}", record.rel_path);
            match self.transport.move_to_trash(&record.rel_path, &trash_rel) {
                Ok(()) => {
                    debug!(path = %record.rel_path, "moved to trash");
                    self.bump(item, kind, |c| c.copied += 1);
                    moved.push(record.rel_path.clone());
                }
                Err(e) => {
                    warn!(path = %record.rel_path, error = %e, "trash move failed");
                    self.bump(item, kind, |c| c.errors += 1);
                    self.log_skip(&mut logger, "TRASH", SkipReason::TransferError, record);
                }
            }

            Self::advance(item, progress, &target, &record.rel_path);
        }

        self.ctx.remote_index.remove_many(&moved)?;
        Ok(())
    }

    /// Whether the destination already holds an equal copy of the record
    fn destination_matches(&self, dest: &Path, record: &FileRecord) -> bool {
        let Ok(metadata) = std::fs::metadata(dest) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };

        let observed = FileRecord {
            rel_path: record.rel_path.clone(),
            size: metadata.len(),
            mtime: unix_mtime(modified),
            digest: None,
        };
        self.ctx.policy.records_equal(&observed, record)
    }

    fn bump(&self, item: &mut QueueItem, kind: FrameKind, update: impl FnOnce(&mut Counters)) {
        match kind {
            FrameKind::Light => update(&mut item.lights),
            FrameKind::Flat => update(&mut item.flats),
        }
    }

    fn advance(
        item: &mut QueueItem,
        progress: &mut dyn FnMut(ProgressEvent<'_>),
        target: &str,
        rel_path: &str,
    ) {
        let processed = item.totals().processed();
        item.progress_percent = if item.planned == 0 {
            100
        } else {
            u8::try_from(processed * 100 / item.planned).unwrap_or(100)
        };
        progress(ProgressEvent::FileProcessed {
            target,
            processed,
            planned: item.planned,
            rel_path,
        });
    }

    fn log_skip(
        &self,
        logger: &mut SkipLogger,
        context: &str,
        reason: SkipReason,
        record: &FileRecord,
    ) {
        if let Err(e) = logger.log(context, reason, &record.rel_path) {
            warn!(path = %record.rel_path, error = %e, "could not write skip log entry");
        }
    }
}
