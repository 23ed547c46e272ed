//! sheetfill-store: the two durable collaborators of the batch runner
//!
//! - [`Sheet`]: a tabular data source addressed by 1-based rows/columns
//! - [`CheckpointStore`]: a small key/value store holding the resume cursor
//!
//! Each has a file-backed implementation and an in-memory one.

mod atomic;
pub mod checkpoint;
pub mod sheet;

pub use checkpoint::{CheckpointStore, JsonFileStore, MemoryStore, default_checkpoint_path};
pub use sheet::{CsvSheet, MemorySheet, Sheet};
