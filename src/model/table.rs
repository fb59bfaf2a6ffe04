//! Table types.

use serde::{Deserialize, Serialize};

/// A table structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in the table, top to bottom
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from rows of cell texts.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows.into_iter().map(Row::from_strings).collect(),
        }
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cells in the row, as received
    pub cells: Vec<Cell>,
}

impl Row {
    /// Create a new row with cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Create a row from text values.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(Cell::new).collect())
    }

    /// Trimmed cell texts joined with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.cells
            .iter()
            .map(Cell::trimmed)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// A table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell content
    pub text: String,
}

impl Cell {
    /// Create a cell with text content.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Trimmed cell text.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Check if the cell holds no visible text.
    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }
}
