//! Ordered, deduplicated action queue
//!
//! The queue holds operator-approved actions, one per target, in explicit
//! array order. Misuse (double enqueue, removing a running item) is rejected
//! synchronously with no state change. Items are mutated only by the
//! executor while running, then left in place carrying their final counters
//! for reporting.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Operator-approved action bound to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    /// Copy missing/differing files from the NAS to the local root
    Pull {
        /// Also pull matching `_FlatWizard` sessions
        include_flats: bool,
    },
    /// Copy local-only/differing files up to the NAS
    Push,
    /// Move remote-only files into the NAS trash namespace
    Trash {
        /// Skip the pull-checkpoint requirement
        force: bool,
    },
}

impl QueueAction {
    /// Short verb for progress lines and log contexts
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pull { .. } => "pull",
            Self::Push => "push",
            Self::Trash { .. } => "trash",
        }
    }
}

/// Lifecycle of one queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemStatus {
    /// Waiting for its turn
    #[default]
    Pending,
    /// Currently executing (at most one at a time)
    Running,
    /// Finished; per-file errors may still be nonzero
    Done,
    /// Could not begin, or was cancelled mid-item
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        f.write_str(text)
    }
}

/// Copied/skipped/errored tallies for one frame category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Files transferred (or moved, for trash items)
    pub copied: usize,
    /// Files found already identical at transfer time
    pub skipped: usize,
    /// Files that failed and were recorded in the skip log
    pub errors: usize,
}

impl Counters {
    /// Files accounted for so far
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.copied + self.skipped + self.errors
    }
}

/// One queued action with its execution bookkeeping
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Target the action applies to
    pub target: String,
    /// What to do
    pub action: QueueAction,
    /// Lifecycle state
    pub status: ItemStatus,
    /// Completion percentage over the planned file count
    pub progress_percent: u8,
    /// Tallies for science frames
    pub lights: Counters,
    /// Tallies for flat-calibration frames
    pub flats: Counters,
    /// Files the executor planned for this item
    pub planned: usize,
    /// Skip log written while the item ran, if any
    pub skip_log: Option<PathBuf>,
}

impl QueueItem {
    fn new(target: String, action: QueueAction) -> Self {
        Self {
            target,
            action,
            status: ItemStatus::Pending,
            progress_percent: 0,
            lights: Counters::default(),
            flats: Counters::default(),
            planned: 0,
            skip_log: None,
        }
    }

    /// Combined tallies across both frame categories
    #[must_use]
    pub const fn totals(&self) -> Counters {
        Counters {
            copied: self.lights.copied + self.flats.copied,
            skipped: self.lights.skipped + self.flats.skipped,
            errors: self.lights.errors + self.flats.errors,
        }
    }

    /// Whether this item still occupies its target's queue slot
    const fn holds_slot(&self) -> bool {
        matches!(self.status, ItemStatus::Pending | ItemStatus::Running)
    }
}

/// Strictly ordered queue, executed head-to-tail
#[derive(Debug, Default)]
pub struct Queue {
    items: Vec<QueueItem>,
}

impl Queue {
    /// Create an empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// All items in execution order
    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Number of items, finished ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no items at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append an action for a target
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTarget`] if the target already has a
    /// Pending or Running item; the queue is unchanged.
    pub fn enqueue(&mut self, target: impl Into<String>, action: QueueAction) -> Result<()> {
        let target = target.into();
        if self
            .items
            .iter()
            .any(|item| item.holds_slot() && item.target == target)
        {
            return Err(Error::DuplicateTarget(target));
        }

        self.items.push(QueueItem::new(target, action));
        Ok(())
    }

    /// Remove a Pending item
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotQueued`] if no item exists for the target, or
    /// [`Error::InvalidState`] if the item is not Pending.
    pub fn dequeue(&mut self, target: &str) -> Result<QueueItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.target == target)
            .ok_or_else(|| Error::NotQueued(target.to_string()))?;

        match self.items[index].status {
            ItemStatus::Pending => Ok(self.items.remove(index)),
            ItemStatus::Running => Err(Error::InvalidState(target.to_string(), "running")),
            ItemStatus::Done | ItemStatus::Failed => {
                Err(Error::InvalidState(target.to_string(), "finished"))
            }
        }
    }

    /// Swap the positions of two Pending items
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotQueued`] if either target is absent, or
    /// [`Error::InvalidState`] if either item is not Pending.
    pub fn reorder(&mut self, target_a: &str, target_b: &str) -> Result<()> {
        let a = self.pending_index(target_a)?;
        let b = self.pending_index(target_b)?;
        self.items.swap(a, b);
        Ok(())
    }

    /// Index of the next Pending item, head-to-tail
    #[must_use]
    pub fn next_pending(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.status == ItemStatus::Pending)
    }

    /// Mutable access for the executor
    pub(crate) fn item_mut(&mut self, index: usize) -> &mut QueueItem {
        &mut self.items[index]
    }

    fn pending_index(&self, target: &str) -> Result<usize> {
        let index = self
            .items
            .iter()
            .position(|item| item.target == target)
            .ok_or_else(|| Error::NotQueued(target.to_string()))?;

        if self.items[index].status != ItemStatus::Pending {
            return Err(Error::InvalidState(target.to_string(), "not pending"));
        }
        Ok(index)
    }
}
