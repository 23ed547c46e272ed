//! Runtime configuration for the batch runner and extraction client

use std::time::Duration;

/// Extraction service used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://contact-extractor-api-h86v.onrender.com/extract";

/// Extraction service settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `GET {endpoint}?url=...`
    pub endpoint: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Extra request headers (e.g. a tunnel or firewall bypass header)
    pub headers: Vec<(String, String)>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
            headers: Vec::new(),
        }
    }
}

/// Where inputs and outputs live in the sheet (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    /// First data row; rows above it are headers
    pub start_row: usize,
    pub url_column: usize,
    /// First of the three output columns (name, email, phone)
    pub output_column: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            start_row: 2,
            url_column: 1,
            output_column: 2,
        }
    }
}

/// Batch runner settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub layout: SheetLayout,
    /// Max rows per invocation
    pub batch_size: usize,
    /// Soft wall-clock ceiling per invocation, checked between rows
    pub time_budget: Duration,
    /// Pause after every request
    pub delay: Duration,
    /// Checkpoint key holding the next row
    pub cursor_key: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            batch_size: 15,
            time_budget: Duration::from_secs(270),
            delay: Duration::from_millis(150),
            cursor_key: "nextRow".to_string(),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let layout = &self.layout;
        anyhow::ensure!(self.batch_size > 0, "batch size must be at least 1");
        anyhow::ensure!(layout.start_row >= 1, "start row is 1-based");
        anyhow::ensure!(
            layout.url_column >= 1 && layout.output_column >= 1,
            "columns are 1-based"
        );
        anyhow::ensure!(
            !(layout.output_column..layout.output_column + 3).contains(&layout.url_column),
            "output columns {}-{} would overwrite the URL column {}",
            layout.output_column,
            layout.output_column + 2,
            layout.url_column
        );
        anyhow::ensure!(!self.cursor_key.is_empty(), "cursor key must not be empty");
        Ok(())
    }
}
