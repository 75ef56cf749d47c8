//! Terminal output: spinner while the batch runs, styled result lines after.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::workflow::{ErrorEntry, RunReport};

/// Visual progress for one batch run.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    /// Start the spinner with the given label.
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(label.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    pub fn warn(&self, message: &str) {
        println!("  {} {message}", self.yellow.apply_to("!"));
    }

    /// Print one styled line per logged error.
    pub fn errors(&self, error_log: &[ErrorEntry]) {
        for entry in error_log {
            match entry.row_number {
                Some(row) => println!(
                    "  {} {} (row {row}): {}",
                    self.red.apply_to("✗"),
                    entry.step,
                    entry.detail
                ),
                None => println!(
                    "  {} {}: {}",
                    self.red.apply_to("✗"),
                    entry.step,
                    entry.detail
                ),
            }
        }
    }

    /// One-line outcome: processed/synced/failed counts.
    pub fn summary(&self, report: &RunReport) {
        let failed = if report.failed > 0 {
            self.red.apply_to(report.failed)
        } else {
            self.green.apply_to(report.failed)
        };
        println!(
            "  {} {} of {} rows processed: {} synced, {failed} failed",
            self.green.apply_to("✓"),
            report.processed,
            report.total,
            self.green.apply_to(report.success),
        );
    }

    /// Print the full run report as pretty JSON.
    pub fn print_report(&self, report: &RunReport) {
        println!();
        println!("{}", self.green.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}
