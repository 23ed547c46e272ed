//! Sheetfill Core - Shared infrastructure for spreadsheet enrichment
//!
//! Logging, progress reporting, shutdown signalling and the blocking
//! HTTP bridge used by the extraction client.

pub mod http;
pub mod logging;
pub mod progress;
pub mod shutdown;

// Re-exports for convenience
pub use http::{FetchError, HttpResponse, http_client, send_blocking};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, shutdown_flag};
