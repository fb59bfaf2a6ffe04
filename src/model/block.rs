//! Raw analysis blocks, as emitted by the document-analysis service.
//!
//! Field names follow the service's wire schema (PascalCase), so a saved
//! response can be loaded with `serde_json` and written back unchanged.
//! Fields the model does not know about are kept in [`Block::extra`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Kind of a raw block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    /// A page of the analyzed document
    Page,
    /// A line of text
    Line,
    /// A single word
    Word,
    /// A checkbox or radio button
    SelectionElement,
    /// A table
    Table,
    /// A table cell
    Cell,
    /// A cell spanning several grid positions
    MergedCell,
    /// A form key or value
    KeyValueSet,
    /// Any block type this crate does not interpret
    Other(String),
}

impl BlockType {
    /// Wire name of the block type.
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Page => "PAGE",
            BlockType::Line => "LINE",
            BlockType::Word => "WORD",
            BlockType::SelectionElement => "SELECTION_ELEMENT",
            BlockType::Table => "TABLE",
            BlockType::Cell => "CELL",
            BlockType::MergedCell => "MERGED_CELL",
            BlockType::KeyValueSet => "KEY_VALUE_SET",
            BlockType::Other(name) => name,
        }
    }
}

impl From<String> for BlockType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "PAGE" => BlockType::Page,
            "LINE" => BlockType::Line,
            "WORD" => BlockType::Word,
            "SELECTION_ELEMENT" => BlockType::SelectionElement,
            "TABLE" => BlockType::Table,
            "CELL" => BlockType::Cell,
            "MERGED_CELL" => BlockType::MergedCell,
            "KEY_VALUE_SET" => BlockType::KeyValueSet,
            _ => BlockType::Other(name),
        }
    }
}

impl From<BlockType> for String {
    fn from(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection state of a checkbox-like element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionStatus {
    /// The element is checked
    Selected,
    /// The element is not checked
    NotSelected,
}

impl SelectionStatus {
    /// Wire name of the status (`SELECTED` / `NOT_SELECTED`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStatus::Selected => "SELECTED",
            SelectionStatus::NotSelected => "NOT_SELECTED",
        }
    }

    /// Check if the element is checked.
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionStatus::Selected)
    }
}

impl std::fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounding box in page-relative coordinates (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    /// Width as a ratio of page width
    pub width: f32,
    /// Height as a ratio of page height
    pub height: f32,
    /// Left edge as a ratio of page width
    pub left: f32,
    /// Top edge as a ratio of page height
    pub top: f32,
}

impl BoundingBox {
    /// Create a bounding box from its top-left corner and size.
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            left,
            top,
        }
    }
}

/// A polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "X")]
    pub x: f32,
    #[serde(rename = "Y")]
    pub y: f32,
}

/// Location of a block on its page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    /// Coarse bounding box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Fine-grained outline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<Point>,
}

impl Geometry {
    /// Top-left corner as `(x, y)`.
    ///
    /// Uses the bounding box when present, otherwise the minimum of the
    /// polygon vertices. Returns `None` when neither is available.
    pub fn top_left(&self) -> Option<(f32, f32)> {
        if let Some(bbox) = self.bounding_box {
            return Some((bbox.left, bbox.top));
        }
        let first = self.polygon.first()?;
        Some(self.polygon.iter().fold((first.x, first.y), |(x, y), p| {
            (x.min(p.x), y.min(p.y))
        }))
    }
}

/// Kind of link between two blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationshipType {
    /// Structural containment (page → line, line → word, table → cell)
    Child,
    /// Key → value link for form fields
    Value,
    /// Table → merged cell link
    MergedCell,
    /// Any other relationship
    Other(String),
}

impl From<String> for RelationshipType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "CHILD" => RelationshipType::Child,
            "VALUE" => RelationshipType::Value,
            "MERGED_CELL" => RelationshipType::MergedCell,
            _ => RelationshipType::Other(name),
        }
    }
}

impl From<RelationshipType> for String {
    fn from(kind: RelationshipType) -> Self {
        match kind {
            RelationshipType::Child => "CHILD".to_string(),
            RelationshipType::Value => "VALUE".to_string(),
            RelationshipType::MergedCell => "MERGED_CELL".to_string(),
            RelationshipType::Other(name) => name,
        }
    }
}

/// A typed list of referenced block ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    /// Relationship kind
    #[serde(rename = "Type")]
    pub kind: RelationshipType,
    /// Referenced block ids, in service order
    #[serde(default)]
    pub ids: Vec<String>,
}

impl Relationship {
    /// Create a `CHILD` relationship.
    pub fn children<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind: RelationshipType::Child,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// A raw geometric and semantic unit from the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    /// Block kind
    pub block_type: BlockType,

    /// Unique id within the analysis job
    pub id: String,

    /// Recognized text (lines and words)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Recognition confidence (0 - 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Position on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,

    /// Links to other blocks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,

    /// Checkbox state (selection elements only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<SelectionStatus>,

    /// 1-indexed row of a cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,

    /// 1-indexed column of a cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,

    /// Number of rows a cell spans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,

    /// Number of columns a cell spans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,

    /// 1-indexed page the block belongs to (multi-page jobs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Fields not interpreted by this crate, kept for round-tripping
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    /// Create a bare block of the given type.
    pub fn new(id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            block_type,
            id: id.into(),
            text: None,
            confidence: None,
            geometry: None,
            relationships: Vec::new(),
            selection_status: None,
            row_index: None,
            column_index: None,
            row_span: None,
            column_span: None,
            page: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Create a `PAGE` block.
    pub fn page(id: impl Into<String>) -> Self {
        Self::new(id, BlockType::Page)
    }

    /// Create a `LINE` block with text.
    pub fn line(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, BlockType::Line).with_text(text)
    }

    /// Create a `WORD` block with text.
    pub fn word(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, BlockType::Word).with_text(text)
    }

    /// Create a `SELECTION_ELEMENT` block.
    pub fn selection(id: impl Into<String>, status: SelectionStatus) -> Self {
        let mut block = Self::new(id, BlockType::SelectionElement);
        block.selection_status = Some(status);
        block
    }

    /// Create a `TABLE` block.
    pub fn table(id: impl Into<String>) -> Self {
        Self::new(id, BlockType::Table)
    }

    /// Create a `CELL` block at the given 1-indexed grid position.
    pub fn cell(id: impl Into<String>, row: u32, column: u32) -> Self {
        let mut block = Self::new(id, BlockType::Cell);
        block.row_index = Some(row);
        block.column_index = Some(column);
        block
    }

    /// Set text and return self.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the bounding box from its top-left corner and return self.
    pub fn at(mut self, left: f32, top: f32) -> Self {
        let bbox = BoundingBox::new(left, top, 0.0, 0.0);
        self.geometry = Some(Geometry {
            bounding_box: Some(bbox),
            polygon: Vec::new(),
        });
        self
    }

    /// Set the full bounding box and return self.
    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.geometry = Some(Geometry {
            bounding_box: Some(bbox),
            polygon: Vec::new(),
        });
        self
    }

    /// Append a `CHILD` relationship and return self.
    pub fn with_children<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.relationships.push(Relationship::children(ids));
        self
    }

    /// Ids of all `CHILD` relationships, in order.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|r| r.kind == RelationshipType::Child)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    /// Top-left corner of the block, if it carries geometry.
    pub fn top_left(&self) -> Option<(f32, f32)> {
        self.geometry.as_ref().and_then(Geometry::top_left)
    }

    /// Text of the block, or an empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// The combined block set of one analysis job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisDocument {
    /// All blocks, across every result page of the job
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl AnalysisDocument {
    /// Create an empty block set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block set from blocks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Load a block set from JSON (`{"Blocks": [...]}`).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::MalformedResponse(format!("invalid block JSON: {}", e)))
    }

    /// Append the blocks of one result page.
    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) {
        self.blocks.extend(blocks);
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the block set is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of `PAGE` blocks.
    pub fn page_count(&self) -> usize {
        self.count_of(&BlockType::Page)
    }

    /// Number of blocks of the given type.
    pub fn count_of(&self, block_type: &BlockType) -> usize {
        self.blocks
            .iter()
            .filter(|b| &b.block_type == block_type)
            .count()
    }

    /// Map from block id to its position in `blocks`.
    ///
    /// When an id is duplicated the first occurrence wins.
    pub fn index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.blocks.len());
        for (i, block) in self.blocks.iter().enumerate() {
            index.entry(block.id.as_str()).or_insert(i);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_wire_names() {
        let json = r#"["LINE", "SELECTION_ELEMENT", "LAYOUT_TEXT"]"#;
        let types: Vec<BlockType> = serde_json::from_str(json).unwrap();
        assert_eq!(types[0], BlockType::Line);
        assert_eq!(types[1], BlockType::SelectionElement);
        assert_eq!(types[2], BlockType::Other("LAYOUT_TEXT".to_string()));

        let back = serde_json::to_string(&types).unwrap();
        assert_eq!(back, r#"["LINE","SELECTION_ELEMENT","LAYOUT_TEXT"]"#);
    }

    #[test]
    fn test_block_from_service_json() {
        let json = r#"{
            "BlockType": "SELECTION_ELEMENT",
            "Id": "se-1",
            "Confidence": 99.1,
            "SelectionStatus": "NOT_SELECTED",
            "Geometry": {
                "BoundingBox": {"Width": 0.01, "Height": 0.01, "Left": 0.2, "Top": 0.4},
                "Polygon": [{"X": 0.2, "Y": 0.4}]
            },
            "Page": 2
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_type, BlockType::SelectionElement);
        assert_eq!(block.selection_status, Some(SelectionStatus::NotSelected));
        assert_eq!(block.top_left(), Some((0.2, 0.4)));
        assert_eq!(block.page, Some(2));
        assert!(block.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let json = r#"{"BlockType":"WORD","Id":"w1","Text":"Hi","TextType":"PRINTED"}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.extra.get("TextType").unwrap(), "PRINTED");

        let back = serde_json::to_value(&block).unwrap();
        assert_eq!(back["TextType"], "PRINTED");
        assert_eq!(back["Text"], "Hi");
    }

    #[test]
    fn test_polygon_fallback() {
        let geometry = Geometry {
            bounding_box: None,
            polygon: vec![
                Point { x: 0.5, y: 0.3 },
                Point { x: 0.2, y: 0.4 },
                Point { x: 0.6, y: 0.35 },
            ],
        };
        assert_eq!(geometry.top_left(), Some((0.2, 0.3)));
        assert_eq!(Geometry::default().top_left(), None);
    }

    #[test]
    fn test_child_ids_skip_other_relationships() {
        let mut block = Block::page("p").with_children(["a", "b"]);
        block.relationships.push(Relationship {
            kind: RelationshipType::Value,
            ids: vec!["v".to_string()],
        });
        let ids: Vec<_> = block.child_ids().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_analysis_document_json() {
        let doc = AnalysisDocument::from_json(r#"{"Blocks":[{"BlockType":"PAGE","Id":"p1"}]}"#)
            .unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(AnalysisDocument::from_json("{\"Blocks\": 3}").is_err());
    }
}
