//! Flattening an ordered document into one linear text artifact.
//!
//! Per page, lines are emitted first and tables after them:
//!
//! - blank lines are dropped;
//! - a line with checkboxes gets exactly one suffix, `SELECTED` when any
//!   element is checked and `UNANSWERED` otherwise;
//! - tables follow a `TABLE:` marker, one row per entry with cells joined
//!   by `" | "`, and an empty entry after each table.
//!
//! Entries are joined with `\n`.

use crate::model::{Document, Line, Page, SelectionStatus};

/// Marker entry emitted before a page's tables.
pub const TABLE_MARKER: &str = "\nTABLE:";

/// Separator between cells of a table row.
pub const CELL_SEPARATOR: &str = " | ";

/// Suffix for checkbox lines where nothing is selected.
pub const UNANSWERED: &str = "UNANSWERED";

/// Convert a document to the flattened plain-text form.
pub fn to_text(doc: &Document) -> String {
    let mut entries = Vec::new();
    for page in &doc.pages {
        render_page(page, &mut entries);
    }
    entries.join("\n")
}

/// Render one line, or `None` when its trimmed text is empty.
pub fn render_line(line: &Line) -> Option<String> {
    let text = line.trimmed();
    if text.is_empty() {
        return None;
    }

    let rendered = match line.selection_decision() {
        Some(SelectionStatus::Selected) => {
            format!("{} {}", text, SelectionStatus::Selected.as_str().to_uppercase())
        }
        Some(SelectionStatus::NotSelected) => format!("{} {}", text, UNANSWERED),
        None => text.to_string(),
    };
    Some(rendered)
}

fn render_page(page: &Page, entries: &mut Vec<String>) {
    entries.extend(page.lines.iter().filter_map(render_line));
    log::debug!("Page {}: lines rendered", page.number);

    if page.has_tables() {
        entries.push(TABLE_MARKER.to_string());
        for table in &page.tables {
            entries.extend(table.rows.iter().map(|row| row.join(CELL_SEPARATOR)));
            entries.push(String::new());
        }
    }
    log::debug!("Page {}: {} tables rendered", page.number, page.tables.len());
}
