//! `sheetfill health` - ping the extraction service

use anyhow::Result;
use sheetfill_extract::HttpExtractor;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let extractor = HttpExtractor::new(&config.api_config()?)?;
    let body = extractor.health()?;
    log::info!("Extraction service is up");
    println!("{}", body.trim());
    Ok(())
}
