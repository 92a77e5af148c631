//! Queue execution reporting

use crate::queue::{ItemStatus, Queue};

/// Text reporter for a drained queue
pub struct QueueReporter;

impl QueueReporter {
    /// Create a new reporter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generate a summary report over every item in the queue
    #[must_use]
    pub fn generate_summary(queue: &Queue) -> String {
        let mut output = String::new();

        output.push_str("\n=== Queue Summary ===\n");

        let mut copied = 0;
        let mut skipped = 0;
        let mut errors = 0;
        let mut failed_items = 0;

        for item in queue.items() {
            let totals = item.totals();
            copied += totals.copied;
            skipped += totals.skipped;
            errors += totals.errors;
            if item.status == ItemStatus::Failed {
                failed_items += 1;
            }

            output.push_str(&format!(
                "{:<28} {:<6} {:<8} lights {}/{}/{}  flats {}/{}/{}\n",
                item.target,
                item.action.label(),
                item.status.to_string(),
                item.lights.copied,
                item.lights.skipped,
                item.lights.errors,
                item.flats.copied,
                item.flats.skipped,
                item.flats.errors,
            ));
            if let Some(skip_log) = &item.skip_log {
                output.push_str(&format!("  skip log: {}\n", skip_log.display()));
            }
        }

        output.push_str(&format!(
            "\nCopied:  {copied}\nSkipped: {skipped}\nErrors:  {errors}\n"
        ));

        if errors == 0 && failed_items == 0 {
            output.push_str("Status: ✓ Success\n");
        } else {
            output.push_str(&format!(
                "Status: ✗ Completed with {errors} file error(s), {failed_items} failed item(s)\n"
            ));
        }

        output
    }
}
