//! Building the typed document from the raw block graph.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    AnalysisDocument, Block, BlockType, Cell, Document, Line, Page, Row, SelectionStatus, Table,
    Word,
};

/// Read-only view of a block set with id lookup.
struct BlockGraph<'a> {
    doc: &'a AnalysisDocument,
    index: HashMap<&'a str, usize>,
}

impl<'a> BlockGraph<'a> {
    fn new(doc: &'a AnalysisDocument) -> Self {
        Self {
            doc,
            index: doc.index(),
        }
    }

    fn get(&self, id: &str) -> Option<&'a Block> {
        let block = self.index.get(id).map(|&i| &self.doc.blocks[i]);
        if block.is_none() {
            log::debug!("Skipping dangling block reference {}", id);
        }
        block
    }

    /// Resolved `CHILD` blocks of `block`, in reference order.
    fn children(&self, block: &'a Block) -> impl Iterator<Item = &'a Block> + '_ {
        block.child_ids().filter_map(move |id| self.get(id))
    }
}

/// Assemble a typed [`Document`] from a (usually ordered) block set.
///
/// Pages come from `PAGE` blocks in input order. Lines and tables are the
/// page's `LINE` and `TABLE` children in reference order, so run
/// [`order_blocks`](super::order_blocks) first to get reading order.
pub fn assemble(doc: &AnalysisDocument) -> Document {
    let graph = BlockGraph::new(doc);
    let mut document = Document::new();

    for block in doc.blocks.iter().filter(|b| b.block_type == BlockType::Page) {
        let number = block.page.unwrap_or(document.page_count() + 1);
        let mut page = Page::new(number, block.id.as_str());
        let mut loose_selections = 0;

        for child in graph.children(block) {
            match child.block_type {
                BlockType::Line => page.add_line(build_line(&graph, child)),
                BlockType::Table => page.add_table(build_table(&graph, child)),
                BlockType::SelectionElement => loose_selections += 1,
                _ => {}
            }
        }

        if loose_selections > 0 {
            log::debug!(
                "Page {}: {} selection elements outside any line or cell were not rendered",
                page.number,
                loose_selections
            );
        }

        log::debug!(
            "Assembled page {}: {} lines, {} tables",
            page.number,
            page.lines.len(),
            page.tables.len()
        );
        document.add_page(page);
    }

    document
}

fn selection_status(block: &Block) -> SelectionStatus {
    block.selection_status.unwrap_or_else(|| {
        log::warn!(
            "Selection element {} has no status, treating as not selected",
            block.id
        );
        SelectionStatus::NotSelected
    })
}

fn build_line<'a>(graph: &BlockGraph<'a>, block: &'a Block) -> Line {
    let words = graph
        .children(block)
        .filter_map(|child| match child.block_type {
            BlockType::Word => Some(Word::text(child.text_or_empty())),
            BlockType::SelectionElement => Some(Word::selection(selection_status(child))),
            _ => None,
        })
        .collect();

    Line::with_words(block.text_or_empty(), words)
}

fn build_table<'a>(graph: &BlockGraph<'a>, block: &'a Block) -> Table {
    let mut rows: BTreeMap<u32, Vec<Cell>> = BTreeMap::new();

    for cell in graph
        .children(block)
        .filter(|c| c.block_type == BlockType::Cell)
    {
        let row = cell.row_index.unwrap_or_else(|| {
            log::warn!("Cell {} has no row index, placing it first", cell.id);
            0
        });
        rows.entry(row)
            .or_default()
            .push(Cell::new(cell_text(graph, cell)));
    }

    Table {
        rows: rows.into_values().map(Row::new).collect(),
    }
}

/// Words are followed by a space, checkboxes by `", "`; the result is trimmed.
/// A checked box before "Yes" gives `SELECTED, Yes`.
fn cell_text<'a>(graph: &BlockGraph<'a>, cell: &'a Block) -> String {
    let mut text = String::new();
    for child in graph.children(cell) {
        match child.block_type {
            BlockType::Word => {
                text.push_str(child.text_or_empty());
                text.push(' ');
            }
            BlockType::SelectionElement => {
                text.push_str(selection_status(child).as_str());
                text.push_str(", ");
            }
            _ => {}
        }
    }
    text.trim().to_string()
}
