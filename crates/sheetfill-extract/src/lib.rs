//! sheetfill-extract - contact enrichment of a sheet, one batch at a time
//!
//! Reads URLs from a [`Sheet`](sheetfill_store::Sheet), asks the extraction
//! service for each one, writes name/email/phone back and keeps a resume
//! cursor in a [`CheckpointStore`](sheetfill_store::CheckpointStore).

pub mod api;
pub mod clock;
pub mod config;
pub mod runner;
pub mod state;
pub mod stats;

// Re-exports
pub use api::{Extractor, HttpExtractor, classify_response};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiConfig, BatchConfig, DEFAULT_ENDPOINT, SheetLayout};
pub use runner::BatchRunner;
pub use state::{Contact, CursorState, FailureReason, RowOutcome};
pub use stats::{BatchReport, StopReason};
