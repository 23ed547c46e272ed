//! Batch statistics and reporting.

use std::fmt;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use sheetfill_core::fmt_num;

use crate::state::RowOutcome;

/// Why an invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every planned row was processed
    Finished,
    /// Soft time budget elapsed between rows
    TimeBudget,
    /// Shutdown signal received between rows
    Shutdown,
    /// No data rows at or after the start row
    EmptyRange,
    /// Cursor was already past the last row
    AlreadyComplete,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Finished => "finished",
            Self::TimeBudget => "time budget reached",
            Self::Shutdown => "interrupted",
            Self::EmptyRange => "no data rows",
            Self::AlreadyComplete => "already complete",
        })
    }
}

/// Outcome of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// First row of the slice (0 when nothing was planned)
    pub from_row: usize,
    pub last_row: usize,
    pub planned: usize,
    pub processed: usize,
    pub extracted: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Stored cursor after the run; `None` once the range is complete
    pub next_row: Option<usize>,
    pub stop: StopReason,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Report for an invocation that processed nothing.
    pub fn idle(stop: StopReason, last_row: usize) -> Self {
        Self {
            from_row: 0,
            last_row,
            planned: 0,
            processed: 0,
            extracted: 0,
            failed: 0,
            skipped: 0,
            next_row: None,
            stop,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, outcome: &RowOutcome) {
        self.processed += 1;
        match outcome {
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Extracted(_) => self.extracted += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Inclusive row span actually processed.
    pub fn processed_rows(&self) -> Option<(usize, usize)> {
        (self.processed > 0).then(|| (self.from_row, self.from_row + self.processed - 1))
    }

    pub fn is_partial(&self) -> bool {
        self.processed < self.planned
    }

    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Batch")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
            ]);

        let rows = match self.processed_rows() {
            Some((first, last)) => format!("{first}-{last} of {}", self.last_row),
            None => "-".to_string(),
        };
        table.add_row(vec![Cell::new("Rows"), Cell::new(rows)]);
        table.add_row(vec![
            Cell::new("Processed"),
            Cell::new(format!(
                "{}/{}",
                fmt_num(self.processed),
                fmt_num(self.planned)
            )),
        ]);
        table.add_row(vec![
            Cell::new("Extracted"),
            Cell::new(fmt_num(self.extracted)).fg(Color::Green),
        ]);
        table.add_row(vec![
            Cell::new("Failed"),
            Cell::new(fmt_num(self.failed)).fg(if self.failed > 0 {
                Color::Red
            } else {
                Color::Reset
            }),
        ]);
        table.add_row(vec![Cell::new("Empty URL"), Cell::new(fmt_num(self.skipped))]);
        table.add_row(vec![
            Cell::new("Next row"),
            Cell::new(self.next_row.map_or("done".to_string(), |r| r.to_string())),
        ]);
        table.add_row(vec![Cell::new("Stopped"), Cell::new(self.stop.to_string())]);
        table.add_row(vec![
            Cell::new("Elapsed"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]);
        table.to_string()
    }

    /// Print table to stderr (TTY mode).
    pub fn print(&self) {
        eprintln!("\n{}", self.format_table());
    }

    /// One-line summary (non-TTY mode).
    pub fn log(&self) {
        let next = self
            .next_row
            .map_or("done".to_string(), |r| format!("next row {r}"));
        match self.processed_rows() {
            Some((first, last)) => log::info!(
                "Rows {first}-{last}: {} extracted, {} failed, {} empty ({}, {next}) [{:.1}s]",
                self.extracted,
                self.failed,
                self.skipped,
                self.stop,
                self.elapsed.as_secs_f64()
            ),
            None => log::info!("No rows processed ({}, {next})", self.stop),
        }
    }
}
