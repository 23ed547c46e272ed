pub mod health;
pub mod reset;
pub mod run;
pub mod status;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

/// Print a key-value table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

pub fn print_config(config: &Config) {
    let headers = if config.api.headers.is_empty() {
        "none".to_string()
    } else {
        // Names only; values may be secrets
        config
            .api
            .headers
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    print_summary(
        "Setting",
        &[
            ("Sheet", config.sheet.path.display().to_string()),
            ("Start row", config.sheet.start_row.to_string()),
            ("URL column", config.sheet.url_column.to_string()),
            (
                "Output columns",
                format!(
                    "{}-{} (name, email, phone)",
                    config.sheet.output_column,
                    config.sheet.output_column + 2
                ),
            ),
            ("Endpoint", config.api.endpoint.clone()),
            ("Timeout", format!("{}s", config.api.timeout_secs)),
            ("Headers", headers),
            ("Batch size", config.batch.size.to_string()),
            ("Time budget", format!("{}s", config.batch.time_budget_secs)),
            ("Delay", format!("{}ms", config.batch.delay_ms)),
            ("Checkpoint", config.checkpoint_path().display().to_string()),
            ("Cursor key", config.checkpoint.key.clone()),
        ],
    );
}
