//! Row and cursor state types

use std::fmt;

/// The three output cells of a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// Cells in output column order: name, email, phone.
    pub fn to_row(&self) -> Vec<String> {
        vec![self.name.clone(), self.email.clone(), self.phone.clone()]
    }
}

/// Why a row produced no contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No response at all (connect, timeout, body read)
    Transport(String),
    /// Response status other than 200
    HttpStatus(u16),
    /// Body is an HTML page rather than JSON
    HtmlBody,
    /// Body is not valid JSON
    InvalidJson(String),
    /// Valid JSON without `success: true` and a `data` object
    Rejected(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::HttpStatus(status) => write!(f, "HTTP {status}"),
            Self::HtmlBody => f.write_str("HTML response instead of JSON"),
            Self::InvalidJson(message) => write!(f, "invalid JSON: {message}"),
            Self::Rejected(detail) => write!(f, "rejected: {detail}"),
        }
    }
}

/// Result of processing one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Empty URL cell; no request was made
    Skipped,
    Extracted(Contact),
    Failed(FailureReason),
}

impl RowOutcome {
    /// The triple to write: the contact on success, empty cells otherwise.
    pub fn into_contact(self) -> Contact {
        match self {
            Self::Extracted(contact) => contact,
            Self::Skipped | Self::Failed(_) => Contact::default(),
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted(_))
    }
}

/// Where the next batch starts, after range resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Sheet has no data rows at or after the start row
    Empty,
    /// Cursor was past the last row; it has been cleared
    Complete { last_row: usize },
    /// Rows `from_row..=last_row` remain
    Pending { from_row: usize, last_row: usize },
}

impl CursorState {
    /// Resolve a stored cursor against the data range `start_row..=last_row`.
    ///
    /// A missing, non-numeric or too-small cursor means `start_row`.
    pub fn resolve(start_row: usize, last_row: usize, stored: Option<&str>) -> Self {
        if last_row < start_row {
            return Self::Empty;
        }
        let from_row = match stored.map(|raw| raw.trim().parse::<usize>()) {
            Some(Ok(row)) if row >= start_row => row,
            None => start_row,
            Some(_) => {
                log::warn!(
                    "Ignoring cursor {:?}, restarting at row {start_row}",
                    stored.unwrap_or_default()
                );
                start_row
            }
        };
        if from_row > last_row {
            Self::Complete { last_row }
        } else {
            Self::Pending { from_row, last_row }
        }
    }

    /// Rows left to process.
    pub fn remaining(&self) -> usize {
        match self {
            Self::Empty | Self::Complete { .. } => 0,
            Self::Pending { from_row, last_row } => last_row + 1 - from_row,
        }
    }
}
