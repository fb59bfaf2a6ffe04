//! Document-level types.

use super::Page;
use serde::{Deserialize, Serialize};

/// An analyzed document, assembled from the raw block graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Pages in the document
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        if page_num == 0 {
            return None;
        }
        self.pages.get((page_num - 1) as usize)
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total number of lines across all pages.
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }

    /// Total number of tables across all pages.
    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|p| p.tables.len()).sum()
    }

    /// Total number of selection elements attached to lines.
    pub fn selection_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| &p.lines)
            .map(|l| l.selection_elements().count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Line, SelectionStatus, Table, Word};

    #[test]
    fn test_get_page_is_one_indexed() {
        let mut doc = Document::new();
        doc.add_page(Page::new(1, "p1"));
        assert!(doc.get_page(0).is_none());
        assert_eq!(doc.get_page(1).unwrap().id, "p1");
        assert!(doc.get_page(2).is_none());
    }

    #[test]
    fn test_counts() {
        let mut page = Page::new(1, "p1");
        page.add_line(Line::new("a").push(Word::selection(SelectionStatus::Selected)));
        page.add_line(Line::new("b"));
        page.add_table(Table::from_rows([["x"]]));

        let mut doc = Document::new();
        doc.add_page(page);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.table_count(), 1);
        assert_eq!(doc.selection_count(), 1);
    }
}
