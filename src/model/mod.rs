//! Document model types.
//!
//! Two layers live here: the raw [`Block`] graph exactly as the analysis
//! service emits it, and the typed [`Document`] (pages of lines and tables)
//! that the renderer consumes.

mod block;
mod document;
mod page;
mod table;

pub use block::{
    AnalysisDocument, Block, BlockType, BoundingBox, Geometry, Point, Relationship,
    RelationshipType, SelectionStatus,
};
pub use document::Document;
pub use page::{Line, Page, SelectionElement, TextWord, Word};
pub use table::{Cell, Row, Table};
