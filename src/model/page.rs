//! Page-level types.

use super::{SelectionStatus, Table};
use serde::{Deserialize, Serialize};

/// A single page of the analyzed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Id of the `PAGE` block this page was built from
    pub id: String,

    /// Lines in reading order
    pub lines: Vec<Line>,

    /// Tables in reading order
    pub tables: Vec<Table>,
}

impl Page {
    /// Create an empty page.
    pub fn new(number: u32, id: impl Into<String>) -> Self {
        Self {
            number,
            id: id.into(),
            lines: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Add a line to the page.
    pub fn add_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Add a table to the page.
    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Check if the page has neither lines nor tables.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.tables.is_empty()
    }

    /// Check if the page has at least one table.
    pub fn has_tables(&self) -> bool {
        !self.tables.is_empty()
    }
}

/// A line of text, possibly carrying checkboxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Line text as recognized by the service
    pub text: String,

    /// Words of the line, in service order
    pub words: Vec<Word>,
}

impl Line {
    /// Create a line with text and no words.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            words: Vec::new(),
        }
    }

    /// Create a line with text and words.
    pub fn with_words(text: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            text: text.into(),
            words,
        }
    }

    /// Append a word and return self.
    pub fn push(mut self, word: Word) -> Self {
        self.words.push(word);
        self
    }

    /// Trimmed line text.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Selection elements of the line, in order.
    pub fn selection_elements(&self) -> impl Iterator<Item = &SelectionElement> {
        self.words.iter().filter_map(|word| match word {
            Word::Selection(element) => Some(element),
            Word::Text(_) => None,
        })
    }

    /// Check if the line holds at least one selection element.
    pub fn has_selection(&self) -> bool {
        self.selection_elements().next().is_some()
    }

    /// The single selection decision for this line.
    ///
    /// `None` for plain lines. Otherwise the status of the first selected
    /// element, or `NotSelected` when no element is selected.
    pub fn selection_decision(&self) -> Option<SelectionStatus> {
        let mut seen = false;
        for element in self.selection_elements() {
            if element.status.is_selected() {
                return Some(element.status);
            }
            seen = true;
        }
        seen.then_some(SelectionStatus::NotSelected)
    }
}

/// A unit inside a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Word {
    /// A plain text token
    Text(TextWord),

    /// A checkbox or radio button
    Selection(SelectionElement),
}

impl Word {
    /// Create a text word.
    pub fn text(text: impl Into<String>) -> Self {
        Word::Text(TextWord { text: text.into() })
    }

    /// Create a selection element word.
    pub fn selection(status: SelectionStatus) -> Self {
        Word::Selection(SelectionElement { status })
    }
}

/// A plain text token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWord {
    /// Token text
    pub text: String,
}

/// A checkbox or radio-like element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionElement {
    /// Whether the element is checked
    pub status: SelectionStatus,
}
