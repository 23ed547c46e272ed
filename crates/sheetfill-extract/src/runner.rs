//! Resumable batch loop
//!
//! One invocation processes at most `batch_size` rows starting at the stored
//! cursor, writes their contacts back in a single bulk write and advances
//! the cursor by the number of rows actually processed. Rows are handled
//! strictly in order, one request at a time.
//!
//! Cursor lifecycle: unset → set(k) → advancing → unset (range complete).
//! At most one runner may use a given checkpoint store at a time; nothing
//! here enforces that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use indicatif::ProgressBar;
use sheetfill_core::shutdown_flag;
use sheetfill_store::{CheckpointStore, Sheet};

use crate::api::Extractor;
use crate::clock::Clock;
use crate::config::BatchConfig;
use crate::state::{Contact, CursorState, RowOutcome};
use crate::stats::{BatchReport, StopReason};

/// Drives one sheet through the extraction service.
pub struct BatchRunner<'a> {
    sheet: &'a mut dyn Sheet,
    store: &'a mut dyn CheckpointStore,
    extractor: &'a dyn Extractor,
    clock: &'a dyn Clock,
    config: &'a BatchConfig,
    shutdown: &'a AtomicBool,
}

impl<'a> BatchRunner<'a> {
    /// Runner watching the process-wide shutdown flag.
    pub fn new(
        sheet: &'a mut dyn Sheet,
        store: &'a mut dyn CheckpointStore,
        extractor: &'a dyn Extractor,
        clock: &'a dyn Clock,
        config: &'a BatchConfig,
    ) -> Self {
        Self {
            sheet,
            store,
            extractor,
            clock,
            config,
            shutdown: shutdown_flag(),
        }
    }

    /// Watch `flag` instead of the process-wide shutdown flag.
    pub fn with_shutdown_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.shutdown = flag;
        self
    }

    /// Work out where the next batch starts.
    ///
    /// An empty range leaves the store untouched. A missing, non-numeric or
    /// too-small cursor means "start row". A cursor past the last row is
    /// deleted.
    pub fn resolve_cursor(&mut self) -> anyhow::Result<CursorState> {
        let start_row = self.config.layout.start_row;
        let last_row = self.sheet.last_row();
        if last_row < start_row {
            return Ok(CursorState::Empty);
        }

        let key = self.config.cursor_key.as_str();
        let stored = self
            .store
            .get(key)
            .with_context(|| format!("Cannot read cursor '{key}'"))?;
        let state = CursorState::resolve(start_row, last_row, stored.as_deref());
        if let CursorState::Complete { last_row } = state {
            log::info!("Cursor is past last row {last_row}, range complete");
            self.store
                .delete(key)
                .with_context(|| format!("Cannot clear cursor '{key}'"))?;
        }
        Ok(state)
    }

    /// Process the next slice and checkpoint.
    pub fn run_batch(&mut self, pb: &ProgressBar) -> anyhow::Result<BatchReport> {
        let started = self.clock.now();
        let (from_row, last_row) = match self.resolve_cursor()? {
            CursorState::Empty => {
                log::info!("No data rows at or after row {}", self.config.layout.start_row);
                return Ok(BatchReport::idle(StopReason::EmptyRange, self.sheet.last_row()));
            }
            CursorState::Complete { last_row } => {
                return Ok(BatchReport::idle(StopReason::AlreadyComplete, last_row));
            }
            CursorState::Pending { from_row, last_row } => (from_row, last_row),
        };

        let planned = self.config.batch_size.min(last_row - from_row + 1);
        log::info!("Processing rows {from_row}-{} of {last_row}", from_row + planned - 1);

        let mut report =
            self.process_rows(from_row, planned, Some(self.config.time_budget), started, pb)?;
        report.last_row = last_row;

        let key = self.config.cursor_key.as_str();
        let next_row = from_row + report.processed;
        if next_row <= last_row {
            self.store
                .set(key, &next_row.to_string())
                .with_context(|| format!("Cannot save cursor '{key}'"))?;
            report.next_row = Some(next_row);
        } else {
            self.store
                .delete(key)
                .with_context(|| format!("Cannot clear cursor '{key}'"))?;
            log::info!("All rows up to {last_row} processed");
        }

        report.elapsed = self.clock.now().saturating_sub(started);
        Ok(report)
    }

    /// Process the whole range in one pass: no cursor, no time budget, no
    /// batch size limit. Still paced and written back in one bulk write.
    pub fn run_full(&mut self, pb: &ProgressBar) -> anyhow::Result<BatchReport> {
        let started = self.clock.now();
        let start_row = self.config.layout.start_row;
        let last_row = self.sheet.last_row();
        if last_row < start_row {
            log::info!("No data rows at or after row {start_row}");
            return Ok(BatchReport::idle(StopReason::EmptyRange, last_row));
        }

        let planned = last_row - start_row + 1;
        log::info!("Processing all rows {start_row}-{last_row}");
        let mut report = self.process_rows(start_row, planned, None, started, pb)?;
        report.last_row = last_row;
        report.elapsed = self.clock.now().saturating_sub(started);
        Ok(report)
    }

    /// Extract `count` rows from `from_row` and write back whatever was
    /// processed before a stop condition.
    fn process_rows(
        &mut self,
        from_row: usize,
        count: usize,
        time_budget: Option<Duration>,
        started: Duration,
        pb: &ProgressBar,
    ) -> anyhow::Result<BatchReport> {
        let layout = self.config.layout;
        let urls = self
            .sheet
            .read_range(from_row, layout.url_column, count, 1)
            .context("Cannot read URL column")?;

        let mut report = BatchReport::idle(StopReason::Finished, 0);
        report.from_row = from_row;
        report.planned = count;

        pb.set_length(count as u64);
        let mut contacts: Vec<Contact> = Vec::with_capacity(count);

        for (offset, cells) in urls.iter().enumerate() {
            let row = from_row + offset;
            let url = cells.first().map_or("", |cell| cell.trim());

            let outcome = if url.is_empty() {
                RowOutcome::Skipped
            } else {
                pb.set_message(url.to_string());
                let outcome = self.extractor.extract(url);
                self.clock.sleep(self.config.delay);
                outcome
            };
            log_outcome(row, &outcome);
            report.record(&outcome);
            contacts.push(outcome.into_contact());
            pb.inc(1);

            if offset + 1 == count {
                break;
            }
            if self.shutdown.load(Ordering::Relaxed) {
                log::warn!("Shutdown requested, stopping after row {row}");
                report.stop = StopReason::Shutdown;
                break;
            }
            if let Some(budget) = time_budget {
                let elapsed = self.clock.now().saturating_sub(started);
                if elapsed > budget {
                    log::warn!(
                        "Time budget of {:.0}s reached after row {row} ({:.1}s elapsed)",
                        budget.as_secs_f64(),
                        elapsed.as_secs_f64()
                    );
                    report.stop = StopReason::TimeBudget;
                    break;
                }
            }
        }
        pb.finish_and_clear();

        self.write_back(from_row, &contacts)?;
        Ok(report)
    }

    /// One bulk write of the processed triples; nothing when empty.
    fn write_back(&mut self, from_row: usize, contacts: &[Contact]) -> anyhow::Result<()> {
        if contacts.is_empty() {
            return Ok(());
        }
        let rows: Vec<Vec<String>> = contacts.iter().map(Contact::to_row).collect();
        self.sheet
            .write_range(from_row, self.config.layout.output_column, &rows)
            .with_context(|| {
                format!(
                    "Cannot write rows {from_row}-{}",
                    from_row + contacts.len() - 1
                )
            })
    }
}

fn log_outcome(row: usize, outcome: &RowOutcome) {
    match outcome {
        RowOutcome::Skipped => log::debug!("Row {row}: empty URL, skipped"),
        RowOutcome::Extracted(c) => {
            log::info!("Row {row} OK: {}, {}, {}", c.name, c.email, c.phone)
        }
        RowOutcome::Failed(reason) => log::warn!("Row {row} failed: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use sheetfill_store::{MemorySheet, MemoryStore};

    use super::*;
    use crate::clock::ManualClock;
    use crate::state::FailureReason;

    /// Canned outcomes per URL; unknown URLs fail with 404. Each call can
    /// advance the clock to simulate slow requests.
    struct FakeExtractor<'c> {
        outcomes: HashMap<String, RowOutcome>,
        calls: RefCell<Vec<String>>,
        clock: Option<(&'c ManualClock, Duration)>,
    }

    impl<'c> FakeExtractor<'c> {
        fn new() -> Self {
            Self {
                outcomes: HashMap::new(),
                calls: RefCell::new(Vec::new()),
                clock: None,
            }
        }

        fn with(mut self, url: &str, outcome: RowOutcome) -> Self {
            self.outcomes.insert(url.to_string(), outcome);
            self
        }

        fn slow(mut self, clock: &'c ManualClock, per_call: Duration) -> Self {
            self.clock = Some((clock, per_call));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Extractor for FakeExtractor<'_> {
        fn extract(&self, url: &str) -> RowOutcome {
            self.calls.borrow_mut().push(url.to_string());
            if let Some((clock, per_call)) = self.clock {
                clock.advance(per_call);
            }
            self.outcomes
                .get(url)
                .cloned()
                .unwrap_or(RowOutcome::Failed(FailureReason::HttpStatus(404)))
        }
    }

    fn numbered_urls(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("https://site{i}.example")).collect()
    }

    fn config(batch_size: usize) -> BatchConfig {
        BatchConfig {
            batch_size,
            delay: Duration::from_millis(150),
            ..Default::default()
        }
    }

    fn output(sheet: &MemorySheet, row: usize) -> Vec<String> {
        sheet.read_range(row, 2, 1, 3).unwrap().remove(0)
    }

    #[test]
    fn empty_range_touches_nothing() {
        let mut sheet = MemorySheet::with_urls::<&str>("url", &[]);
        let mut store = MemoryStore::new();
        let extractor = FakeExtractor::new();
        let clock = ManualClock::new();
        let config = config(15);
        let flag = AtomicBool::new(false);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(report.stop, StopReason::EmptyRange);
        assert_eq!(store.mutations(), 0);
        assert_eq!(sheet.writes(), 0);
    }

    #[test]
    fn cursor_past_last_row_is_cleared_without_work() {
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(5));
        let mut store = MemoryStore::new();
        store.set("nextRow", "7").unwrap();
        let extractor = FakeExtractor::new();
        let clock = ManualClock::new();
        let config = config(15);
        let flag = AtomicBool::new(false);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(report.stop, StopReason::AlreadyComplete);
        assert!(extractor.calls().is_empty());
        assert_eq!(sheet.writes(), 0);
        assert_eq!(store.get("nextRow").unwrap(), None);
    }

    #[test]
    fn invalid_cursor_restarts_at_start_row() {
        for raw in ["abc", "-3", "1", "0", ""] {
            let mut sheet = MemorySheet::with_urls("url", &numbered_urls(3));
            let mut store = MemoryStore::new();
            store.set("nextRow", raw).unwrap();
            let extractor = FakeExtractor::new();
            let clock = ManualClock::new();
            let config = config(15);

            let state = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
                .resolve_cursor()
                .unwrap();
            assert_eq!(
                state,
                CursorState::Pending {
                    from_row: 2,
                    last_row: 4
                },
                "cursor {raw:?}"
            );
        }
    }

    #[test]
    fn cursor_with_whitespace_is_accepted() {
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(10));
        let mut store = MemoryStore::new();
        store.set("nextRow", " 6 ").unwrap();
        let extractor = FakeExtractor::new();
        let clock = ManualClock::new();
        let config = config(15);

        let state = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .resolve_cursor()
            .unwrap();
        assert_eq!(
            state,
            CursorState::Pending {
                from_row: 6,
                last_row: 11
            }
        );
    }

    #[test]
    fn outcomes_map_to_triples() {
        let urls = vec![
            "https://ok.example".to_string(),
            "   ".to_string(),
            "https://down.example".to_string(),
            "  https://padded.example  ".to_string(),
        ];
        let mut sheet = MemorySheet::with_urls("url", &urls);
        let mut store = MemoryStore::new();
        let extractor = FakeExtractor::new()
            .with(
                "https://ok.example",
                RowOutcome::Extracted(Contact::new("A", "b@x.com", "1")),
            )
            .with(
                "https://padded.example",
                RowOutcome::Extracted(Contact::new("P", "p@x.com", "2")),
            );
        let clock = ManualClock::new();
        let config = config(15);
        let flag = AtomicBool::new(false);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(output(&sheet, 2), vec!["A", "b@x.com", "1"]);
        assert_eq!(output(&sheet, 3), vec!["", "", ""]);
        assert_eq!(output(&sheet, 4), vec!["", "", ""]);
        assert_eq!(output(&sheet, 5), vec!["P", "p@x.com", "2"]);
        assert_eq!(
            extractor.calls(),
            vec![
                "https://ok.example",
                "https://down.example",
                "https://padded.example"
            ]
        );
        assert_eq!((report.extracted, report.failed, report.skipped), (2, 1, 1));
        assert_eq!(sheet.writes(), 1);
        assert_eq!(report.next_row, None);
        assert_eq!(store.get("nextRow").unwrap(), None);
    }

    #[test]
    fn delay_only_after_network_attempts() {
        let urls = vec!["https://a.example".to_string(), String::new()];
        let mut sheet = MemorySheet::with_urls("url", &urls);
        let mut store = MemoryStore::new();
        let extractor = FakeExtractor::new();
        let clock = ManualClock::new();
        let config = config(15);
        let flag = AtomicBool::new(false);

        BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(clock.now(), Duration::from_millis(150));
    }

    #[test]
    fn resumes_across_invocations() {
        // Header + 39 data rows: last row 40
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(39));
        let mut store = MemoryStore::new();
        let extractor = FakeExtractor::new();
        let clock = ManualClock::new();
        let config = config(15);
        let flag = AtomicBool::new(false);

        let mut spans = Vec::new();
        for _ in 0..3 {
            let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
                .with_shutdown_flag(&flag)
                .run_batch(&ProgressBar::hidden())
                .unwrap();
            spans.push(report.processed_rows().unwrap());
            assert_eq!(report.stop, StopReason::Finished);
        }

        assert_eq!(spans, vec![(2, 16), (17, 31), (32, 40)]);
        assert_eq!(store.get("nextRow").unwrap(), None);
        assert_eq!(extractor.calls().len(), 39);
    }

    #[test]
    fn time_budget_stops_between_rows() {
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(20));
        let mut store = MemoryStore::new();
        let clock = ManualClock::new();
        // 1s request + 150ms delay per row: 1.15s, 2.3s, 3.45s > 3s
        let extractor = FakeExtractor::new().slow(&clock, Duration::from_secs(1));
        let config = BatchConfig {
            time_budget: Duration::from_secs(3),
            ..config(15)
        };
        let flag = AtomicBool::new(false);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(report.stop, StopReason::TimeBudget);
        assert_eq!(report.planned, 15);
        assert_eq!(report.processed, 3);
        assert!(report.is_partial());
        assert_eq!(store.get("nextRow").unwrap().as_deref(), Some("5"));
        assert_eq!(sheet.writes(), 1);
        assert_eq!(extractor.calls().len(), 3);
        // Row 5 onwards untouched
        assert_eq!(
            sheet.read_range(5, 2, 1, 3).unwrap(),
            vec![vec!["", "", ""]]
        );
        assert_eq!(sheet.rows()[4].len(), 1);
    }

    #[test]
    fn budget_is_not_checked_after_last_planned_row() {
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(2));
        let mut store = MemoryStore::new();
        let clock = ManualClock::new();
        let extractor = FakeExtractor::new().slow(&clock, Duration::from_secs(10));
        let config = BatchConfig {
            time_budget: Duration::from_secs(1),
            ..config(2)
        };
        let flag = AtomicBool::new(false);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        // First request alone blows the budget
        assert_eq!(report.processed, 1);
        assert_eq!(report.stop, StopReason::TimeBudget);

        // Row 3 is the whole slice now, so no budget stop applies
        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();
        assert_eq!(report.processed_rows(), Some((3, 3)));
        assert_eq!(report.stop, StopReason::Finished);
        assert_eq!(store.get("nextRow").unwrap(), None);
    }

    #[test]
    fn shutdown_flag_stops_like_time_budget() {
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(10));
        let mut store = MemoryStore::new();
        let extractor = FakeExtractor::new();
        let clock = ManualClock::new();
        let config = config(15);
        let flag = AtomicBool::new(true);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_batch(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(report.stop, StopReason::Shutdown);
        assert_eq!(report.processed, 1);
        assert_eq!(store.get("nextRow").unwrap().as_deref(), Some("3"));
        assert_eq!(sheet.writes(), 1);
    }

    #[test]
    fn run_full_ignores_cursor_and_budget() {
        let mut sheet = MemorySheet::with_urls("url", &numbered_urls(30));
        let mut store = MemoryStore::new();
        store.set("nextRow", "20").unwrap();
        let clock = ManualClock::new();
        let extractor = FakeExtractor::new().slow(&clock, Duration::from_secs(60));
        let config = config(15);
        let flag = AtomicBool::new(false);

        let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
            .with_shutdown_flag(&flag)
            .run_full(&ProgressBar::hidden())
            .unwrap();

        assert_eq!(report.processed_rows(), Some((2, 31)));
        assert_eq!(report.stop, StopReason::Finished);
        assert_eq!(sheet.writes(), 1);
        assert_eq!(store.get("nextRow").unwrap().as_deref(), Some("20"));
        assert_eq!(store.mutations(), 1);
    }

    #[test]
    fn repeated_passes_are_identical() {
        let urls = numbered_urls(6);
        let mut extractor = FakeExtractor::new();
        for (i, url) in urls.iter().enumerate().step_by(2) {
            extractor = extractor.with(
                url,
                RowOutcome::Extracted(Contact::new(format!("N{i}"), "e@x.com", "")),
            );
        }
        let mut sheet = MemorySheet::with_urls("url", &urls);
        let mut store = MemoryStore::new();
        let clock = ManualClock::new();
        let config = config(4);
        let flag = AtomicBool::new(false);

        let mut passes = Vec::new();
        for _ in 0..2 {
            loop {
                let report = BatchRunner::new(&mut sheet, &mut store, &extractor, &clock, &config)
                    .with_shutdown_flag(&flag)
                    .run_batch(&ProgressBar::hidden())
                    .unwrap();
                if report.next_row.is_none() {
                    break;
                }
            }
            passes.push(sheet.rows().to_vec());
        }

        assert_eq!(passes[0], passes[1]);
        assert_eq!(output(&sheet, 2), vec!["N0", "e@x.com", ""]);
        assert_eq!(output(&sheet, 3), vec!["", "", ""]);
    }
}
