//! `sheetfill status` - show progress without touching anything

use anyhow::{Context, Result};
use sheetfill_core::fmt_num;
use sheetfill_extract::CursorState;
use sheetfill_store::{CheckpointStore, CsvSheet, JsonFileStore, Sheet};

use crate::cmd::print_summary;
use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let batch = config.batch_config()?;
    let sheet = CsvSheet::open(&config.sheet.path)?;
    let checkpoint_path = config.checkpoint_path();
    let store = JsonFileStore::open(&checkpoint_path)?;

    let key = batch.cursor_key.as_str();
    let stored = store
        .get(key)
        .with_context(|| format!("Cannot read cursor '{key}'"))?;
    let last_row = sheet.last_row();
    let state = CursorState::resolve(batch.layout.start_row, last_row, stored.as_deref());

    let position = match state {
        CursorState::Empty => "no data rows".to_string(),
        CursorState::Complete { .. } => "complete".to_string(),
        CursorState::Pending { from_row, .. } => format!("next row {from_row}"),
    };
    let batches = state.remaining().div_ceil(batch.batch_size);

    print_summary(
        "Status",
        &[
            ("Sheet", config.sheet.path.display().to_string()),
            ("Last row", last_row.to_string()),
            ("Checkpoint", checkpoint_path.display().to_string()),
            ("Cursor", stored.unwrap_or_else(|| "unset".to_string())),
            ("Position", position),
            (
                "Remaining",
                format!("{} rows ({batches} batches)", fmt_num(state.remaining())),
            ),
            (
                "Updated",
                store.updated_at().map_or("never".to_string(), |t| {
                    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
                }),
            ),
        ],
    );
    Ok(())
}
