//! `sheetfill reset` - clear the cursor

use anyhow::{Context, Result};
use sheetfill_store::{CheckpointStore, JsonFileStore};

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let path = config.checkpoint_path();
    let mut store = JsonFileStore::open(&path)?;
    let key = config.checkpoint.key.as_str();

    match store.get(key)? {
        Some(cursor) => {
            store
                .delete(key)
                .with_context(|| format!("Cannot clear cursor '{key}'"))?;
            log::info!("Cleared cursor {key}={cursor} in {}", path.display());
        }
        None => log::info!("No cursor stored in {}", path.display()),
    }
    Ok(())
}
