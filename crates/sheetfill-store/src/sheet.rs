//! Tabular data source
//!
//! Rows and columns are 1-based, matching how spreadsheets address cells.
//! Cells are plain strings; a cell beyond the end of a record reads as `""`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Read/write access to a rectangular region of a sheet.
pub trait Sheet {
    /// Index of the last row with any non-blank cell (0 when empty).
    fn last_row(&self) -> usize;

    /// Read `row_count` × `col_count` cells starting at (`start_row`, `col`).
    fn read_range(
        &self,
        start_row: usize,
        col: usize,
        row_count: usize,
        col_count: usize,
    ) -> Result<Vec<Vec<String>>>;

    /// Overwrite cells starting at (`start_row`, `col`), one slice per row.
    fn write_range(&mut self, start_row: usize, col: usize, rows: &[Vec<String>]) -> Result<()>;
}

/// Row-major cell grid shared by the CSV and in-memory sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    fn last_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map_or(0, |idx| idx + 1)
    }

    fn read(
        &self,
        start_row: usize,
        col: usize,
        row_count: usize,
        col_count: usize,
    ) -> Result<Vec<Vec<String>>> {
        check_origin(start_row, col)?;
        let values = (start_row..start_row + row_count)
            .map(|r| {
                let record = self.rows.get(r - 1);
                (col..col + col_count)
                    .map(|c| {
                        record
                            .and_then(|cells| cells.get(c - 1))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Ok(values)
    }

    fn write(&mut self, start_row: usize, col: usize, rows: &[Vec<String>]) -> Result<()> {
        check_origin(start_row, col)?;
        let needed_rows = start_row - 1 + rows.len();
        if self.rows.len() < needed_rows {
            self.rows.resize_with(needed_rows, Vec::new);
        }
        for (offset, values) in rows.iter().enumerate() {
            let record = &mut self.rows[start_row - 1 + offset];
            let needed_cols = col - 1 + values.len();
            if record.len() < needed_cols {
                record.resize_with(needed_cols, String::new);
            }
            for (c, value) in values.iter().enumerate() {
                record[col - 1 + c].clone_from(value);
            }
        }
        Ok(())
    }
}

fn check_origin(start_row: usize, col: usize) -> Result<()> {
    anyhow::ensure!(
        start_row >= 1 && col >= 1,
        "sheet coordinates are 1-based (got row {start_row}, column {col})"
    );
    Ok(())
}

// =============================================================================
// CSV-backed sheet
// =============================================================================

/// A sheet stored as a CSV file.
///
/// Every record is a row (row 1 is usually the header). Blank lines are not
/// records. Each [`Sheet::write_range`] rewrites the whole file atomically.
#[derive(Debug)]
pub struct CsvSheet {
    path: PathBuf,
    grid: Grid,
}

impl CsvSheet {
    /// Load a CSV file into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("failed to open sheet {}", path.display()))?;

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("{}: bad CSV record {}", path.display(), idx + 1))?;
            rows.push(record.iter().map(String::from).collect());
        }
        log::debug!("Loaded {} rows from {}", rows.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            grid: Grid { rows },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in &self.grid.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to encode CSV: {}", e.error()))?;
        crate::atomic::replace_file(&self.path, &bytes)
    }
}

impl Sheet for CsvSheet {
    fn last_row(&self) -> usize {
        self.grid.last_row()
    }

    fn read_range(
        &self,
        start_row: usize,
        col: usize,
        row_count: usize,
        col_count: usize,
    ) -> Result<Vec<Vec<String>>> {
        self.grid.read(start_row, col, row_count, col_count)
    }

    fn write_range(&mut self, start_row: usize, col: usize, rows: &[Vec<String>]) -> Result<()> {
        self.grid.write(start_row, col, rows)?;
        self.save()
            .with_context(|| format!("failed to save sheet {}", self.path.display()))
    }
}

// =============================================================================
// In-memory sheet
// =============================================================================

/// In-memory sheet that counts bulk writes.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    grid: Grid,
    writes: usize,
}

impl MemorySheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            grid: Grid { rows },
            writes: 0,
        }
    }

    /// Sheet with a header row followed by one URL per row in column 1.
    pub fn with_urls<S: AsRef<str>>(header: &str, urls: &[S]) -> Self {
        let rows = std::iter::once(vec![header.to_string()])
            .chain(urls.iter().map(|u| vec![u.as_ref().to_string()]))
            .collect();
        Self::new(rows)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.grid.rows
    }

    /// Number of `write_range` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Sheet for MemorySheet {
    fn last_row(&self) -> usize {
        self.grid.last_row()
    }

    fn read_range(
        &self,
        start_row: usize,
        col: usize,
        row_count: usize,
        col_count: usize,
    ) -> Result<Vec<Vec<String>>> {
        self.grid.read(start_row, col, row_count, col_count)
    }

    fn write_range(&mut self, start_row: usize, col: usize, rows: &[Vec<String>]) -> Result<()> {
        self.grid.write(start_row, col, rows)?;
        self.writes += 1;
        Ok(())
    }
}
